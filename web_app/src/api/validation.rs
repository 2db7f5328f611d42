//! Pre-flight checks of the submitted forms. Pure and synchronous, nothing
//! here reaches the store.

use super::errors::FieldErrors;
use crate::{consts, front};

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

/// `local@domain.tld` with no spaces, one `@` and a dotted domain
pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels = domain.split('.').collect::<Vec<&str>>();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
        && labels.last().is_some_and(|tld| tld.chars().count() >= 2)
}

/// Made only of digits and the usual phone formatting characters
pub fn looks_like_phone(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '(' | ')' | '-'))
}

pub fn is_valid_phone(value: &str) -> bool {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    looks_like_phone(value) && (consts::MIN_PHONE_DIGITS..=consts::MAX_PHONE_DIGITS).contains(&digits)
}

/// Error message of a contact channel, None when it is usable
pub fn contact_error(value: &str) -> Option<String> {
    if value.contains('@') {
        return (!is_valid_email(value)).then(|| "Enter a valid email address".to_string());
    }

    if looks_like_phone(value) {
        return (!is_valid_phone(value)).then(|| {
            format!(
                "Phone numbers need between {} and {} digits",
                consts::MIN_PHONE_DIGITS,
                consts::MAX_PHONE_DIGITS
            )
        });
    }

    Some("Enter an email address or a phone number".to_string())
}

pub fn validate_pet_form(form: &front::forms::pet::ClaimPetForm) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if char_len(&form.name) < consts::MIN_NAME_LEN {
        errors.insert("name", "The pet name needs at least 2 characters".into());
    }

    if !consts::VALID_PET_TYPES.contains(&form.pet_type.trim().to_lowercase().as_str()) {
        errors.insert("pet_type", "Choose one of the listed pet types".into());
    }

    if char_len(&form.owner_name) < consts::MIN_NAME_LEN {
        errors.insert("owner_name", "The owner name needs at least 2 characters".into());
    }

    let contact = form.owner_contact.trim();
    let phone = form.owner_phone.trim();

    if contact.is_empty() && phone.is_empty() {
        errors.insert(
            "owner_contact",
            "Add at least one way to contact you: email or phone".into(),
        );
        return errors;
    }

    if let Some(message) = (!contact.is_empty()).then(|| contact_error(contact)).flatten() {
        errors.insert("owner_contact", message);
    }

    if !phone.is_empty() && !is_valid_phone(phone) {
        errors.insert(
            "owner_phone",
            format!(
                "Phone numbers need between {} and {} digits",
                consts::MIN_PHONE_DIGITS,
                consts::MAX_PHONE_DIGITS
            ),
        );
    }

    errors
}

pub fn validate_register_form(form: &front::forms::user::RegisterForm) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if !is_valid_email(&form.email) {
        errors.insert("email", "Enter a valid email address".into());
    }

    if form.password.chars().count() < consts::MIN_PASSWORD_LEN {
        errors.insert("password", "The password needs at least 6 characters".into());
    }

    if char_len(&form.full_name) < consts::MIN_NAME_LEN {
        errors.insert("full_name", "Your name needs at least 2 characters".into());
    }

    if !form.phone.trim().is_empty() && !is_valid_phone(&form.phone) {
        errors.insert("phone", "Enter a valid phone number".into());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use front::forms::{pet::ClaimPetForm, user::RegisterForm};

    fn valid_form() -> ClaimPetForm {
        ClaimPetForm {
            name: "Rex".into(),
            pet_type: "dog".into(),
            owner_name: "Jo".into(),
            owner_contact: "jo@example.com".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_payload_has_no_errors() {
        assert!(validate_pet_form(&valid_form()).is_empty());
    }

    #[test]
    fn test_short_name_fails() {
        let errors = validate_pet_form(&ClaimPetForm {
            name: "A".into(),
            ..valid_form()
        });

        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key("name"));
    }

    #[test]
    fn test_malformed_email_contact_fails() {
        let errors = validate_pet_form(&ClaimPetForm {
            owner_contact: "not-an-email@".into(),
            ..valid_form()
        });

        assert_eq!(
            errors.get("owner_contact").map(String::as_str),
            Some("Enter a valid email address")
        );
    }

    #[test]
    fn test_missing_contact_channels() {
        let errors = validate_pet_form(&ClaimPetForm {
            owner_contact: "  ".into(),
            owner_phone: String::new(),
            ..valid_form()
        });

        assert!(errors.contains_key("owner_contact"));
    }

    #[test]
    fn test_unknown_pet_type() {
        let errors = validate_pet_form(&ClaimPetForm {
            pet_type: "dragon".into(),
            ..valid_form()
        });

        assert!(errors.contains_key("pet_type"));
        assert!(validate_pet_form(&ClaimPetForm {
            pet_type: "Rabbit".into(),
            ..valid_form()
        })
        .is_empty());
    }

    #[test]
    fn test_phone_digit_bounds() {
        assert!(is_valid_phone("+52 (55) 1234-5678"));
        assert!(is_valid_phone("1234567"));
        assert!(!is_valid_phone("123456"));
        assert!(!is_valid_phone("1234567890123456"));

        let errors = validate_pet_form(&ClaimPetForm {
            owner_contact: String::new(),
            owner_phone: "12 34".into(),
            ..valid_form()
        });
        assert!(errors.contains_key("owner_phone"));
    }

    #[test]
    fn test_contact_as_phone_or_garbage() {
        assert_eq!(contact_error("55 1234 5678"), None);
        assert!(contact_error("call me maybe").is_some());
        assert!(contact_error("123").is_some());
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("ana.perez+pets@correo.mx"));
        assert!(!is_valid_email("ana@"));
        assert!(!is_valid_email("@correo.mx"));
        assert!(!is_valid_email("ana@correo"));
        assert!(!is_valid_email("ana@@correo.mx"));
        assert!(!is_valid_email("ana perez@correo.mx"));
    }

    #[test]
    fn test_register_form() {
        let valid = RegisterForm {
            email: "ana@correo.mx".into(),
            password: "secret".into(),
            full_name: "Ana".into(),
            phone: String::new(),
        };
        assert!(validate_register_form(&valid).is_empty());

        let errors = validate_register_form(&RegisterForm {
            email: "ana".into(),
            password: "12345".into(),
            full_name: "A".into(),
            phone: String::new(),
        });
        assert_eq!(
            errors.keys().copied().collect::<Vec<&str>>(),
            vec!["email", "full_name", "password"]
        );
    }
}
