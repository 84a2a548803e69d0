//! Redemption code generation
//!
//! Produces human-friendly candidate codes of the form `XXXX-XXXX-XXXX`.
//! Candidates are random, not unique - uniqueness is the allocator's job.

use rand::Rng;

/// Code alphabet: uppercase letters and digits, excluding the visually
/// ambiguous characters 0, O, 1, I. 32 symbols.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Characters per segment
pub const SEGMENT_LEN: usize = 4;

/// Hyphen-joined segments per code
pub const SEGMENT_COUNT: usize = 3;

/// Generate one candidate code, each character drawn independently and
/// uniformly from the alphabet.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(SEGMENT_COUNT * SEGMENT_LEN + SEGMENT_COUNT - 1);

    for segment in 0..SEGMENT_COUNT {
        if segment > 0 {
            code.push('-');
        }
        for _ in 0..SEGMENT_LEN {
            let idx = rng.gen_range(0..CODE_ALPHABET.len());
            code.push(CODE_ALPHABET[idx] as char);
        }
    }

    code
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_alphabet(c: char) -> bool {
        CODE_ALPHABET.contains(&(c as u8))
    }

    #[test]
    fn generated_code_has_canonical_shape() {
        for _ in 0..100 {
            let code = generate_code();
            let segments: Vec<&str> = code.split('-').collect();
            assert_eq!(segments.len(), SEGMENT_COUNT, "code: {}", code);
            for segment in segments {
                assert_eq!(segment.len(), SEGMENT_LEN, "code: {}", code);
                assert!(segment.chars().all(in_alphabet), "code: {}", code);
            }
        }
    }

    #[test]
    fn generated_code_excludes_ambiguous_characters() {
        for _ in 0..200 {
            let code = generate_code();
            for ambiguous in ['0', 'O', '1', 'I'] {
                assert!(!code.contains(ambiguous), "code: {}", code);
            }
        }
    }

    #[test]
    fn alphabet_has_32_symbols() {
        assert_eq!(CODE_ALPHABET.len(), 32);
    }

    #[test]
    fn consecutive_codes_are_unlikely_to_collide() {
        // 32^12 code space - a small sample must not repeat
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(generate_code()));
        }
    }
}
