use std::sync::LazyLock;

use armory_core::prelude::*;

#[derive(Resource)]
struct Limits {
    max: usize,
}

static LIMITS: LazyLock<InstanceProvider<Limits>> = LazyLock::new(|| create_provider(true));

struct Buffer<T> {
    items: Vec<T>,
}

/// Generic impl blocks with private helpers.
#[inject_methods_with_suffix(LIMITS)]
impl<T: Clone> Buffer<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: T, #[injected] max_: usize) -> bool {
        if Self::__full(self.items.len(), max_) {
            return false;
        }
        self.items.push(item);
        true
    }

    fn __full(len: usize, max: usize) -> bool {
        len >= max
    }
}

fn main() {
    Buffer::<u8>::validate_injection().unwrap();

    let mut buffer = Buffer::new();
    let _armed = LIMITS.arm(Limits { max: 1 }).unwrap();

    assert!(buffer.push(1_u8, INJECTED).unwrap());
    assert!(!buffer.push(2_u8, INJECTED).unwrap());
    assert!(buffer.push(3_u8, 5.into()).unwrap());
}
