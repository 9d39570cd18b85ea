use regex::Regex;

pub fn validate_email(email: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    re.is_match(email)
}

pub fn validate_phone(phone: &str) -> bool {
    let re = Regex::new(r"^[6-9]\d{9}$").unwrap();
    re.is_match(phone)
}

/// Rating scores are whole stars, 1 through 5.
pub fn valid_score(score: i32) -> bool {
    (1..=5).contains(&score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bounds() {
        assert!(valid_score(1));
        assert!(valid_score(5));
        assert!(!valid_score(0));
        assert!(!valid_score(6));
    }

    #[test]
    fn email_shapes() {
        assert!(validate_email("builder@example.com"));
        assert!(!validate_email("not-an-email"));
    }
}
