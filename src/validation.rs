use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;
use crate::models::ClientSubmission;

lazy_static! {
    // 10 digits, Indian mobiles start with 6-9
    static ref MOBILE: Regex = Regex::new(r"^[6-9]\d{9}$").unwrap();
    static ref PAN: Regex = Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap();
    static ref AADHAAR: Regex = Regex::new(r"^\d{12}$").unwrap();
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Normalizes and syntactically checks a submission.
///
/// Whitespace is trimmed everywhere, the PAN is upper-cased and spaces are
/// removed from the Aadhaar number. The first failing field decides the error.
pub fn validate(mut submission: ClientSubmission) -> Result<ClientSubmission, AppError> {
    submission.client_name = submission.client_name.trim().to_string();
    submission.father_name = submission.father_name.trim().to_string();
    submission.mobile = submission.mobile.trim().to_string();
    submission.dob = submission.dob.trim().to_string();
    submission.address = submission.address.trim().to_string();
    submission.pan = submission.pan.trim().to_uppercase();
    submission.aadhaar = submission.aadhaar.split_whitespace().collect();
    submission.email = submission.email.trim().to_string();

    let required = [
        ("clientName", &submission.client_name),
        ("fatherName", &submission.father_name),
        ("mobile", &submission.mobile),
        ("dob", &submission.dob),
        ("address", &submission.address),
        ("pan", &submission.pan),
        ("aadhaar", &submission.aadhaar),
        ("email", &submission.email),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
        return Err(AppError::Validation(format!("{field} is required")));
    }

    if !MOBILE.is_match(&submission.mobile) {
        return Err(AppError::Validation(
            "Invalid mobile number. Must be a 10-digit Indian mobile number".to_string(),
        ));
    }
    if !PAN.is_match(&submission.pan) {
        return Err(AppError::Validation(
            "Invalid PAN format. Expected format: ABCDE1234F".to_string(),
        ));
    }
    if !AADHAAR.is_match(&submission.aadhaar) {
        return Err(AppError::Validation(
            "Invalid Aadhaar number. Must be 12 digits".to_string(),
        ));
    }
    if !EMAIL.is_match(&submission.email) {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if NaiveDate::parse_from_str(&submission.dob, "%Y-%m-%d").is_err() {
        return Err(AppError::Validation(
            "Invalid date of birth. Expected YYYY-MM-DD".to_string(),
        ));
    }

    if let Some(id) = submission.client_id.take() {
        let id = id.trim().to_string();
        submission.client_id = (!id.is_empty()).then_some(id);
    }

    Ok(submission)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ClientSubmission {
        ClientSubmission {
            client_name: "Asha Rao".into(),
            father_name: "Vikram Rao".into(),
            mobile: "9876543210".into(),
            dob: "1990-04-12".into(),
            address: "12 MG Road, Bengaluru".into(),
            pan: "ABCDE1234F".into(),
            aadhaar: "123412341234".into(),
            email: "asha@example.com".into(),
            client_id: None,
            recaptcha_token: None,
        }
    }

    fn message(result: Result<ClientSubmission, AppError>) -> String {
        match result {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_well_formed_submission() {
        assert!(validate(valid()).is_ok());
    }

    #[test]
    fn normalizes_pan_and_aadhaar() {
        let mut sub = valid();
        sub.pan = " abcde1234f ".into();
        sub.aadhaar = "1234 1234 1234".into();
        sub.client_id = Some("  ".into());

        let out = validate(sub).unwrap();
        assert_eq!(out.pan, "ABCDE1234F");
        assert_eq!(out.aadhaar, "123412341234");
        assert_eq!(out.client_id, None);
    }

    #[test]
    fn missing_field_is_named() {
        let mut sub = valid();
        sub.father_name = "   ".into();
        assert_eq!(message(validate(sub)), "fatherName is required");
    }

    #[test]
    fn rejects_bad_mobile() {
        for bad in ["5876543210", "98765", "98765432101", "98765abcde"] {
            let mut sub = valid();
            sub.mobile = bad.into();
            assert!(message(validate(sub)).starts_with("Invalid mobile"), "{bad}");
        }
    }

    #[test]
    fn rejects_bad_pan() {
        for bad in ["ABCD1234F", "ABCDE12345", "12345ABCDE"] {
            let mut sub = valid();
            sub.pan = bad.into();
            assert!(message(validate(sub)).starts_with("Invalid PAN"), "{bad}");
        }
    }

    #[test]
    fn rejects_bad_aadhaar() {
        for bad in ["12341234123", "1234123412345", "12341234123a"] {
            let mut sub = valid();
            sub.aadhaar = bad.into();
            assert!(message(validate(sub)).starts_with("Invalid Aadhaar"), "{bad}");
        }
    }

    #[test]
    fn rejects_bad_email_and_dob() {
        let mut sub = valid();
        sub.email = "asha@example".into();
        assert_eq!(message(validate(sub)), "Invalid email address");

        let mut sub = valid();
        sub.dob = "12/04/1990".into();
        assert!(message(validate(sub)).starts_with("Invalid date of birth"));
    }
}
