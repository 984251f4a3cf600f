use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Random alphanumeric token, used for conference request ids and
/// generated meeting links.
pub fn generate_access_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_has_requested_length_and_charset() {
        let token = generate_access_token(9);
        assert_eq!(token.len(), 9);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
