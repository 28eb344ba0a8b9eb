use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt};
use uuid::Uuid;

use crate::task::now_millis;

/// Identifier of a task: the collection key assigned by the remote store.
///
/// An empty id marks a task that has not been persisted yet.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wrap an existing key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Identifier of a task that has not been written yet.
    #[must_use]
    pub const fn unassigned() -> Self {
        Self(String::new())
    }

    /// True until the store assigned a key.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for TaskId {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const TIMESTAMP_LEN: usize = 8;
const RANDOM_LEN: usize = 12;
const MAX_DIGIT: u8 = 63;

/// Generator for realtime-database push keys.
///
/// A key is 20 characters: 8 encode the millisecond timestamp, 12 are random.
/// Keys sort lexicographically in generation order. Within one millisecond the
/// random suffix is incremented instead of re-drawn, so a single generator
/// never emits a key smaller than or equal to its previous one.
#[derive(Debug, Default)]
pub struct PushKeyGenerator {
    last_ms: Option<u64>,
    last_random: [u8; RANDOM_LEN],
}

impl PushKeyGenerator {
    /// Create a generator with no history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_ms: None,
            last_random: [0; RANDOM_LEN],
        }
    }

    /// Generate a key stamped with the current time.
    pub fn next_key(&mut self) -> TaskId {
        self.next_key_at(now_millis())
    }

    /// Generate a key stamped with `now_ms` (milliseconds since the Unix epoch).
    pub fn next_key_at(&mut self, now_ms: i64) -> TaskId {
        let mut ms = u64::try_from(now_ms).unwrap_or(0);
        match self.last_ms {
            Some(last) if ms <= last => {
                // Same millisecond or a clock step backwards: stay on the last stamp.
                ms = last;
                if !increment(&mut self.last_random) {
                    ms = last + 1;
                    self.last_random = random_digits();
                }
            }
            _ => self.last_random = random_digits(),
        }
        self.last_ms = Some(ms);

        let mut key = String::with_capacity(TIMESTAMP_LEN + RANDOM_LEN);
        let mut stamp = [0_u8; TIMESTAMP_LEN];
        let mut rest = ms;
        for slot in stamp.iter_mut().rev() {
            *slot = u8::try_from(rest % 64).unwrap_or(0);
            rest /= 64;
        }
        for digit in stamp.iter().chain(self.last_random.iter()) {
            key.push(symbol(*digit));
        }
        TaskId(key)
    }
}

fn symbol(digit: u8) -> char {
    char::from(PUSH_CHARS[usize::from(digit & MAX_DIGIT)])
}

/// Increment the base-64 suffix in place. Returns false on overflow.
fn increment(digits: &mut [u8; RANDOM_LEN]) -> bool {
    for digit in digits.iter_mut().rev() {
        if *digit == MAX_DIGIT {
            *digit = 0;
        } else {
            *digit += 1;
            return true;
        }
    }
    false
}

fn random_digits() -> [u8; RANDOM_LEN] {
    // Byte 6 carries the UUID version nibble; every other byte is fully random.
    let bytes = Uuid::new_v4().into_bytes();
    let mut digits = [0_u8; RANDOM_LEN];
    for (digit, byte) in digits
        .iter_mut()
        .zip(bytes.iter().enumerate().filter(|(idx, _)| *idx != 6).map(|(_, b)| b))
    {
        *digit = byte & MAX_DIGIT;
    }
    digits
}
