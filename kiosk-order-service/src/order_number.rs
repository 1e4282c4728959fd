use rand::Rng;

pub const ORDER_NUMBER_LENGTH: usize = 8;
pub const ORDER_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Attempts before giving up with `GenerationExhausted`.
pub const MAX_GENERATION_ATTEMPTS: u32 = 5;

pub trait OrderNumberGenerator: Send + Sync {
    fn generate(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomOrderNumbers;

impl OrderNumberGenerator for RandomOrderNumbers {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..ORDER_NUMBER_LENGTH)
            .map(|_| ORDER_NUMBER_ALPHABET[rng.random_range(0..ORDER_NUMBER_ALPHABET.len())] as char)
            .collect()
    }
}

pub fn is_valid_order_number(candidate: &str) -> bool {
    candidate.len() == ORDER_NUMBER_LENGTH
        && candidate.bytes().all(|b| ORDER_NUMBER_ALPHABET.contains(&b))
}

/// Hands out a scripted list of numbers, then falls back to random ones.
#[cfg(any(test, feature = "test-util"))]
pub struct ScriptedOrderNumbers {
    script: std::sync::Mutex<std::collections::VecDeque<String>>,
}

#[cfg(any(test, feature = "test-util"))]
impl ScriptedOrderNumbers {
    pub fn new<I, S>(numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: std::sync::Mutex::new(numbers.into_iter().map(Into::into).collect()),
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
impl OrderNumberGenerator for ScriptedOrderNumbers {
    fn generate(&self) -> String {
        let next = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        next.unwrap_or_else(|| RandomOrderNumbers.generate())
    }
}
