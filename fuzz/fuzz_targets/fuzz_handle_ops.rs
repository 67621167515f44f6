#![no_main]

use arbitrary::Arbitrary;
use datamgr::{Manager, StoreError};
use libfuzzer_sys::fuzz_target;
use serde_json::json;

const SCOPES: [&str; 3] = ["alpha", "beta", "__GLOBAL"];
const KEYS: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Debug, Arbitrary)]
struct Case {
    ops: Vec<Op>,
}

#[derive(Debug, Arbitrary)]
enum Op {
    Set { scope: u8, key: u8, public: bool, value: i32 },
    GetOr { scope: u8, key: u8, public: bool, value: i32 },
    ReadonlySet { scope: u8, key: u8, public: bool, value: i32 },
    Merge { scope: u8, key: u8, public: bool, items: Vec<i32> },
    Update { scope: u8, key: u8, public: bool, delta: i32 },
    Model { scope: u8, key: u8, public: bool, id: u8 },
    Remove { scope: u8, key: u8 },
    Subscribe { scope: u8, key: u8, replacement: Option<i32> },
    DropSubscription,
    PublicValues,
}

fn pick<'a>(names: &[&'a str], index: u8) -> &'a str {
    names[usize::from(index) % names.len()]
}

fn run(dm: &Manager, subs: &mut Vec<datamgr::Subscription>, op: Op) -> Result<(), StoreError> {
    let view = |scope: u8, public: bool| -> Result<_, StoreError> {
        let builder = dm.scope(pick(&SCOPES, scope))?;
        Ok(if public { builder.public() } else { builder.private() })
    };
    match op {
        Op::Set { scope, key, public, value } => {
            view(scope, public)?.mutable().set(pick(&KEYS, key), value)?;
        }
        Op::GetOr { scope, key, public, value } => {
            view(scope, public)?
                .readonly()
                .entry(pick(&KEYS, key))?
                .get_or(value)?;
        }
        Op::ReadonlySet { scope, key, public, value } => {
            view(scope, public)?.readonly().set(pick(&KEYS, key), value)?;
        }
        Op::Merge { scope, key, public, items } => {
            view(scope, public)?
                .mutable()
                .array(pick(&KEYS, key))?
                .merge([items.into_iter().map(|n| json!(n))])?;
        }
        Op::Update { scope, key, public, delta } => {
            view(scope, public)?.mutable().entry(pick(&KEYS, key))?.update(
                |v| json!(v.as_i64().unwrap_or(0).saturating_add(i64::from(delta))),
                json!(0),
            )?;
        }
        Op::Model { scope, key, public, id } => {
            view(scope, public)?
                .readonly()
                .model(pick(&KEYS, key), "Record", id)?
                .get()?;
        }
        Op::Remove { scope, key } => {
            view(scope, false)?.mutable().remove(pick(&KEYS, key));
        }
        Op::Subscribe { scope, key, replacement } => {
            let handle = view(scope, false)?.readonly();
            let topic = format!("{}.{}.{}", dm.root(), handle.name(), pick(&KEYS, key));
            let Ok(pattern) = topic.parse() else {
                return Ok(());
            };
            subs.push(dm.subscribe_topic(pattern, move |_, _, _| replacement.map(|n| json!(n))));
        }
        Op::DropSubscription => {
            subs.pop();
        }
        Op::PublicValues => {
            let values = dm.public_json()?;
            assert!(values.is_object());
        }
    }
    Ok(())
}

fuzz_target!(|case: Case| {
    let mut dm = Manager::new();
    for scope in &SCOPES[..2] {
        if dm.register_scope(*scope).is_err() {
            return;
        }
    }
    let mut subs = Vec::new();
    for op in case.ops {
        // Handle errors are expected outcomes; only panics are findings.
        let _ = run(&dm, &mut subs, op);
    }
    drop(subs);
    assert_eq!(dm.subscriber_count(), 0);
});
