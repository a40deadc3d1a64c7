//! Username generation and validation
//!
//! Generated names are `<prefix><suffix>` where the suffix takes one of
//! three random shapes: letters only, digits only, or letters and digits
//! joined by an underscore.

use rand::Rng;

/// Default prefix for generated usernames
pub const USERNAME_PREFIX: &str = "keyfold_";

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 20;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";

/// Generate a random username with the given prefix.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, prefix: &str) -> String {
    let suffix = match rng.gen_range(0..3) {
        0 => random_chars(rng, LETTERS, 3, 5),
        1 => random_chars(rng, DIGITS, 3, 4),
        _ => format!(
            "{}_{}",
            random_chars(rng, LETTERS, 3, 4),
            random_chars(rng, DIGITS, 2, 3)
        ),
    };

    format!("{}{}", prefix, suffix)
}

/// Check a username against the allowed shape: 3 to 20 characters, ASCII
/// letters, digits and underscores only.
pub fn is_valid(name: &str) -> bool {
    let len = name.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return false;
    }

    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn random_chars<R: Rng + ?Sized>(rng: &mut R, alphabet: &[u8], min: usize, max: usize) -> String {
    let len = rng.gen_range(min..=max);
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}
