// Pronounceable names for newborn monkeys.
//
// Names alternate consonant/vowel starting with a consonant, e.g. `"bodaxi"`.
// The generator does not know which names are taken; callers retry on
// collision.

use rand::Rng;

use super::config::{CONSONANTS, NAME_MAX_LEN, NAME_MIN_LEN, VOWELS};

/// Generate a name of uniformly random length in [2, 10].
pub fn generate_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let len = rng.gen_range(NAME_MIN_LEN..=NAME_MAX_LEN);
    (0..len)
        .map(|i| {
            let set: &[u8] = if i % 2 == 0 { CONSONANTS } else { VOWELS };
            set[rng.gen_range(0..set.len())] as char
        })
        .collect()
}
