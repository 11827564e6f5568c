//! Walkthrough of a provider stack assembled from every layer:
//! a composition of sections, predicate filtering, header/footer
//! framing, two-level expansion, and the debug layer on top.
//!
//! Run with `RUST_LOG=debug` to also see the per-event trace from the
//! debug layer and the downgrade warnings from the wrappers.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use patchwork_core::{
    ChangeHub, ChangeObserver, ItemId, ListEvent, ListProvider, Payload, Rendered, ViewType,
};
use patchwork_wrappers::{
    debug, filtered, DebugControl, ExpandableProvider, FilterControl, GroupedSource,
    HeaderFooterWrapper,
};

struct Contact {
    id: i64,
    name: String,
    online: bool,
}

/// Mutable contact list publishing granular change events.
struct Roster {
    contacts: RefCell<Vec<Contact>>,
    next_id: Cell<i64>,
    hub: ChangeHub,
}

impl Roster {
    fn new(seed: &[(&str, bool)]) -> Rc<Roster> {
        let roster = Rc::new(Roster {
            contacts: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            hub: ChangeHub::new(),
        });
        for &(name, online) in seed {
            roster.add(name, online);
        }
        roster
    }

    fn add(&self, name: &str, online: bool) {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let position = {
            let mut contacts = self.contacts.borrow_mut();
            contacts.push(Contact {
                id,
                name: name.to_string(),
                online,
            });
            contacts.len() - 1
        };
        self.hub.notify_inserted(position, 1);
    }

    fn rename(&self, position: usize, name: &str) {
        self.contacts.borrow_mut()[position].name = name.to_string();
        self.hub.notify_changed(position, 1, None);
    }

    fn set_online(&self, position: usize, online: bool) {
        self.contacts.borrow_mut()[position].online = online;
        self.hub.notify_changed(position, 1, None);
    }

    fn move_contact(&self, from: usize, to: usize) {
        {
            let mut contacts = self.contacts.borrow_mut();
            let contact = contacts.remove(from);
            contacts.insert(to, contact);
        }
        self.hub.notify_moved(from, to, 1);
    }

    fn is_online(&self, position: usize) -> bool {
        self.contacts.borrow()[position].online
    }
}

impl ListProvider for Roster {
    fn item_count(&self) -> usize {
        self.contacts.borrow().len()
    }

    fn item_id(&self, position: usize) -> Option<ItemId> {
        Some(ItemId::direct(self.contacts.borrow()[position].id))
    }

    fn view_type(&self, _position: usize) -> ViewType {
        ViewType::new(0)
    }

    fn bind(&self, position: usize, _payloads: &[Payload]) -> Rendered {
        let contact = &self.contacts.borrow()[position];
        let marker = if contact.online { "" } else { " (offline)" };
        Box::new(format!("{}{}", contact.name, marker))
    }

    fn hub(&self) -> &ChangeHub {
        &self.hub
    }
}

/// Fixed two-level catalog for the expansion demo.
struct Departments {
    groups: Vec<(String, Vec<String>)>,
}

impl Departments {
    fn new() -> Departments {
        Departments {
            groups: vec![
                (
                    "Engineering".to_string(),
                    vec!["Build farm".to_string(), "Code review".to_string()],
                ),
                ("Design".to_string(), vec!["Brand kit".to_string()]),
                ("Operations".to_string(), Vec::new()),
            ],
        }
    }
}

impl GroupedSource for Departments {
    fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn child_count(&self, group: usize) -> usize {
        self.groups[group].1.len()
    }

    fn group_id(&self, group: usize) -> i64 {
        group as i64
    }

    fn child_id(&self, _group: usize, child: usize) -> i64 {
        child as i64
    }

    fn bind_group(&self, group: usize, _payloads: &[Payload]) -> Rendered {
        Box::new(self.groups[group].0.clone())
    }

    fn bind_child(&self, group: usize, child: usize, _payloads: &[Payload]) -> Rendered {
        Box::new(self.groups[group].1[child].clone())
    }

    fn initially_expanded(&self, group: usize) -> bool {
        group == 0
    }
}

struct PrintObserver;

impl ChangeObserver for PrintObserver {
    fn on_event(&self, event: &ListEvent) {
        log::info!("window changed: {:?}", event);
    }
}

fn dump(title: &str, provider: &dyn ListProvider) {
    println!("-- {} ({} rows)", title, provider.item_count());
    for position in 0..provider.item_count() {
        let rendered = provider.bind(position, &[]);
        let text = match rendered.downcast_ref::<String>() {
            Some(text) => text.clone(),
            None => "<opaque>".to_string(),
        };
        let marker = if provider.view_type(position).is_expandable_group() {
            "* "
        } else {
            "  "
        };
        let id = match provider.item_id(position) {
            Some(id) => format!("{:?}", id),
            None => "no id".to_string(),
        };
        println!("  [{}] {}{} ({})", position, marker, text, id);
    }
    println!();
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    println!("=== Patchwork Showcase ===");
    println!("A contact list assembled from composable provider layers:");
    println!("  roster -> online filter -> header/footer frame -> debug layer");
    println!();

    let roster = Roster::new(&[
        ("Ada", true),
        ("Brian", false),
        ("Grace", true),
        ("Linus", true),
    ]);

    let online_only = {
        let roster = roster.clone();
        filtered(roster.clone(), move |_, position| roster.is_online(position))
    };
    let framed = HeaderFooterWrapper::new(
        Roster::new(&[("Online now", true)]),
        online_only.clone(),
        Roster::new(&[("End of list", true)]),
    );
    let stack = debug("contact stack", framed);
    stack.hub().register(Rc::new(PrintObserver));

    dump("initial window", stack.as_ref());

    println!("> Ada renames herself");
    roster.rename(0, "Ada L.");
    dump("after rename", stack.as_ref());

    println!("> Brian comes online (a change that un-hides a row)");
    roster.set_online(1, true);
    dump("after the flip", stack.as_ref());

    println!("> A new contact joins");
    roster.add("Margaret", true);
    dump("after the insert", stack.as_ref());

    println!("> Predicate swap: show everyone, offline included");
    online_only.set_predicate(|_, _| true);
    dump("after the swap", stack.as_ref());

    println!("> Brian drops offline; with the open predicate the row just updates");
    roster.set_online(1, false);
    dump("after the update", stack.as_ref());

    println!("> Margaret moves to the top; moves under a filter downgrade to a refresh");
    roster.move_contact(4, 0);
    dump("after the move", stack.as_ref());

    println!("> Sweeping the stack for identity and round-trip defects");
    stack.verify_identities();
    stack.verify_positions();
    println!("  both sweeps passed");
    println!();

    println!("> Two-level catalog with per-group expansion");
    let catalog = ExpandableProvider::new(Departments::new());
    catalog.hub().register(Rc::new(PrintObserver));
    dump("catalog, first group open", catalog.as_ref());

    catalog.expand(1);
    dump("after expanding Design", catalog.as_ref());

    catalog.collapse(0);
    dump("after collapsing Engineering", catalog.as_ref());

    println!("> Tearing the stacks down");
    stack.release();
    catalog.release();
    println!("done.");
}
