#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;

use genslot::{Error, Handle, SlotMap};

#[derive(Arbitrary, Debug)]
struct Target {
    ctor: Constructor,
    ops: Vec<Op>,
}

#[derive(Arbitrary, Debug)]
enum Constructor {
    New,
    WithCapacity(u8),
}

#[derive(Arbitrary, Debug)]
enum Op {
    Reserve(u8),
    Insert(char),
    InsertWithHandle(char),
    Remove(usize),
    TryRemove(usize),
    RawRemove(u32, u32),
    EraseEvery(u8),
    Retain(Vec<bool>),
    Clear,
    Drain,
}

fuzz_target!(|data: Target| {
    let mut map = match data.ctor {
        Constructor::New => SlotMap::new(),
        Constructor::WithCapacity(n) => SlotMap::with_capacity(n as usize),
    };

    let mut handles = Vec::new();
    let mut live = 0usize;

    for op in data.ops {
        match op {
            Op::Reserve(n) => map.reserve(n as usize),
            Op::Insert(c) => {
                handles.push(map.insert(c));
                live += 1;
            }
            Op::InsertWithHandle(c) => {
                handles.push(map.insert_with_handle(|_| c));
                live += 1;
            }
            Op::Remove(i) => {
                if let Some(h) = handles.get(i) {
                    let was_live = map.contains(*h);
                    match map.remove(*h) {
                        Ok(_) => live -= 1,
                        Err(err) => {
                            assert!(!was_live);
                            assert_eq!(err, Error::StaleHandle);
                        }
                    }
                } else {
                    return;
                }
            }
            Op::TryRemove(i) => {
                if let Some(h) = handles.get(i) {
                    if map.try_remove(*h).is_some() {
                        live -= 1;
                    }
                } else {
                    return;
                }
            }
            Op::RawRemove(generation, index) => {
                let h = Handle::new(generation, index);
                if map.remove(h).is_ok() {
                    live -= 1;
                }
            }
            Op::EraseEvery(n) => {
                let n = n as usize + 1;
                let mut seen = 0;
                let mut cur = map.begin_mut();
                while !cur.is_end() {
                    if seen % n == 0 {
                        cur.remove_current().unwrap();
                        live -= 1;
                    } else {
                        cur.move_next();
                    }
                    seen += 1;
                }
            }
            Op::Retain(s) => {
                let mut i = s.into_iter();
                map.retain(|_h, _v| i.next().unwrap_or(false));
                live = map.len();
            }
            Op::Clear => {
                map.clear();
                live = 0;
            }
            Op::Drain => {
                map.drain();
                live = 0;
            }
        }

        assert_eq!(map.len(), live);
        assert_eq!(map.iter().count(), live);
    }

    for h in handles {
        assert_eq!(map.contains(h), map.get(h).is_some());
    }
});
