//! Form validation for reports and accounts.
//!
//! Rules run in a fixed order and stop at the first failure, so the caller
//! always gets exactly one message to show next to the form.

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::ValidateEmail;

use crate::models::{ProfileUpdate, SignUpRequest};

pub const COMPANY_NAME_MIN: usize = 2;
pub const COMPANY_NAME_MAX: usize = 200;
pub const DESCRIPTION_MIN: usize = 20;
pub const DESCRIPTION_MAX: usize = 5000;
pub const EVIDENCE_MAX: usize = 3000;
pub const EMAIL_MAX: usize = 255;
pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 100;
pub const FULL_NAME_MIN: usize = 2;
pub const FULL_NAME_MAX: usize = 100;

const INCIDENT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw report fields as typed into the form.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportForm {
    /// Company responsible for the leak (2-200 characters)
    pub company_name: String,
    /// Incident date, `YYYY-MM-DD`
    pub incident_date: String,
    /// What happened (20-5000 characters)
    pub description: String,
    /// Optional evidence (up to 3000 characters)
    pub evidence_details: Option<String>,
}

/// Report fields after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReport {
    pub company_name: String,
    pub incident_date: NaiveDate,
    pub description: String,
    pub evidence_details: Option<String>,
}

impl ReportForm {
    pub fn validate(&self) -> Result<ValidReport, String> {
        let company_name = self.company_name.trim();
        check_length(
            company_name,
            COMPANY_NAME_MIN,
            COMPANY_NAME_MAX,
            "Nome da empresa é obrigatório",
            "Nome da empresa deve ter no máximo 200 caracteres",
        )?;

        let incident_date = self.incident_date.trim();
        if incident_date.is_empty() {
            return Err("Data do incidente é obrigatória".to_string());
        }
        let incident_date = NaiveDate::parse_from_str(incident_date, INCIDENT_DATE_FORMAT)
            .map_err(|_| "Data do incidente inválida".to_string())?;

        let description = self.description.trim();
        check_length(
            description,
            DESCRIPTION_MIN,
            DESCRIPTION_MAX,
            "Descrição deve ter no mínimo 20 caracteres",
            "Descrição deve ter no máximo 5000 caracteres",
        )?;

        // Evidence is stored verbatim; only an empty field collapses to none.
        let evidence_details = match self.evidence_details.as_deref() {
            Some(evidence) if char_len(evidence) > EVIDENCE_MAX => {
                return Err("Evidências devem ter no máximo 3000 caracteres".to_string());
            }
            Some("") | None => None,
            Some(evidence) => Some(evidence.to_string()),
        };

        Ok(ValidReport {
            company_name: company_name.to_string(),
            incident_date,
            description: description.to_string(),
            evidence_details,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SignUpForm {
    /// Email address (up to 255 characters)
    pub email: String,
    /// Password (6-100 characters)
    pub password: String,
    /// Full name (2-100 characters)
    pub full_name: String,
    /// Optional phone number
    pub phone: Option<String>,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<SignUpRequest, String> {
        if !is_valid_email(&self.email) || char_len(&self.email) > EMAIL_MAX {
            return Err("Email inválido".to_string());
        }

        check_length(
            &self.password,
            PASSWORD_MIN,
            PASSWORD_MAX,
            "A senha deve ter no mínimo 6 caracteres",
            "A senha deve ter no máximo 100 caracteres",
        )?;

        let full_name = self.full_name.trim();
        check_length(
            full_name,
            FULL_NAME_MIN,
            FULL_NAME_MAX,
            "Nome completo é obrigatório",
            "Nome completo deve ter no máximo 100 caracteres",
        )?;

        let phone = self
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Ok(SignUpRequest {
            email: self.email.clone(),
            password: self.password.clone(),
            profile: ProfileUpdate {
                full_name: full_name.to_string(),
                phone,
            },
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginForm {
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_email(&self.email) {
            return Err("Email inválido".to_string());
        }
        if self.password.is_empty() {
            return Err("Senha é obrigatória".to_string());
        }
        Ok(())
    }
}

/// Trim and uppercase a tracking token typed by the user.
pub fn normalize_tracking_token(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn is_valid_email(email: &str) -> bool {
    email.to_string().validate_email()
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn check_length(
    value: &str,
    min: usize,
    max: usize,
    too_short: &str,
    too_long: &str,
) -> Result<(), String> {
    let len = char_len(value);
    if len < min {
        Err(too_short.to_string())
    } else if len > max {
        Err(too_long.to_string())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_form(company: &str, date: &str, description: &str) -> ReportForm {
        ReportForm {
            company_name: company.to_string(),
            incident_date: date.to_string(),
            description: description.to_string(),
            evidence_details: None,
        }
    }

    fn signup_form(email: &str, password: &str, name: &str) -> SignUpForm {
        SignUpForm {
            email: email.to_string(),
            password: password.to_string(),
            full_name: name.to_string(),
            phone: None,
        }
    }

    #[test]
    fn valid_report_is_trimmed() {
        let form = report_form("  ACME Ltda  ", "2024-01-01", &format!("  {}  ", "x".repeat(25)));
        let valid = form.validate().unwrap();
        assert_eq!(valid.company_name, "ACME Ltda");
        assert_eq!(valid.description, "x".repeat(25));
        assert_eq!(
            valid.incident_date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(valid.evidence_details, None);
    }

    #[test]
    fn description_counts_trimmed_characters() {
        let padded = format!("{}{}", "x".repeat(19), " ".repeat(10));
        let err = report_form("ACME", "2024-01-01", &padded)
            .validate()
            .unwrap_err();
        assert_eq!(err, "Descrição deve ter no mínimo 20 caracteres");
    }

    #[test]
    fn description_upper_bound() {
        let ok = report_form("ACME", "2024-01-01", &"x".repeat(5000));
        assert!(ok.validate().is_ok());
        let too_long = report_form("ACME", "2024-01-01", &"x".repeat(5001));
        assert_eq!(
            too_long.validate().unwrap_err(),
            "Descrição deve ter no máximo 5000 caracteres"
        );
    }

    #[test]
    fn first_failing_field_wins() {
        // Every field is invalid; the company name is checked first.
        let form = report_form(" a ", "", "short");
        assert_eq!(form.validate().unwrap_err(), "Nome da empresa é obrigatório");

        let form = report_form("ACME", "", "short");
        assert_eq!(form.validate().unwrap_err(), "Data do incidente é obrigatória");

        let form = report_form("ACME", "2024-01-01", "short");
        assert_eq!(
            form.validate().unwrap_err(),
            "Descrição deve ter no mínimo 20 caracteres"
        );
    }

    #[test]
    fn company_name_bounds() {
        let desc = "x".repeat(25);
        assert!(report_form("AB", "2024-01-01", &desc).validate().is_ok());
        assert!(report_form(&"a".repeat(200), "2024-01-01", &desc)
            .validate()
            .is_ok());
        assert_eq!(
            report_form(&"a".repeat(201), "2024-01-01", &desc)
                .validate()
                .unwrap_err(),
            "Nome da empresa deve ter no máximo 200 caracteres"
        );
    }

    #[test]
    fn unparseable_date_is_rejected() {
        let desc = "x".repeat(25);
        for date in ["01/01/2024", "2024-13-01", "ontem"] {
            assert_eq!(
                report_form("ACME", date, &desc).validate().unwrap_err(),
                "Data do incidente inválida"
            );
        }
    }

    #[test]
    fn evidence_is_optional_and_bounded() {
        let mut form = report_form("ACME", "2024-01-01", &"x".repeat(25));
        form.evidence_details = Some(String::new());
        assert_eq!(form.validate().unwrap().evidence_details, None);

        form.evidence_details = Some("print da tela".to_string());
        assert_eq!(
            form.validate().unwrap().evidence_details.as_deref(),
            Some("print da tela")
        );

        form.evidence_details = Some("e".repeat(3001));
        assert_eq!(
            form.validate().unwrap_err(),
            "Evidências devem ter no máximo 3000 caracteres"
        );
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        // 20 multi-byte characters satisfy the minimum.
        let form = report_form("Ação", "2024-01-01", &"ç".repeat(20));
        assert!(form.validate().is_ok());
    }

    #[test]
    fn signup_rules_in_order() {
        assert_eq!(
            signup_form("not-an-email", "123", "A").validate().unwrap_err(),
            "Email inválido"
        );
        assert_eq!(
            signup_form("ana@example.com", "123", "A").validate().unwrap_err(),
            "A senha deve ter no mínimo 6 caracteres"
        );
        assert_eq!(
            signup_form("ana@example.com", "123456", " A ")
                .validate()
                .unwrap_err(),
            "Nome completo é obrigatório"
        );
        assert_eq!(
            signup_form("ana@example.com", &"p".repeat(101), "Ana Souza")
                .validate()
                .unwrap_err(),
            "A senha deve ter no máximo 100 caracteres"
        );
    }

    #[test]
    fn signup_rejects_overlong_email() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert_eq!(
            signup_form(&email, "123456", "Ana Souza").validate().unwrap_err(),
            "Email inválido"
        );
    }

    #[test]
    fn signup_normalizes_name_and_phone() {
        let mut form = signup_form("ana@example.com", "123456", "  Ana Souza ");
        form.phone = Some("   ".to_string());
        let req = form.validate().unwrap();
        assert_eq!(req.profile.full_name, "Ana Souza");
        assert_eq!(req.profile.phone, None);

        form.phone = Some(" (11) 91234-5678 ".to_string());
        let req = form.validate().unwrap();
        assert_eq!(req.profile.phone.as_deref(), Some("(11) 91234-5678"));
    }

    #[test]
    fn login_requires_email_then_password() {
        let form = LoginForm {
            email: "bad".to_string(),
            password: String::new(),
        };
        assert_eq!(form.validate().unwrap_err(), "Email inválido");

        let form = LoginForm {
            email: "ana@example.com".to_string(),
            password: String::new(),
        };
        assert_eq!(form.validate().unwrap_err(), "Senha é obrigatória");
    }

    #[test]
    fn tracking_token_is_trimmed_and_uppercased() {
        assert_eq!(normalize_tracking_token("  ab12cd34 \n"), "AB12CD34");
        assert_eq!(
            normalize_tracking_token("ab12cd34"),
            normalize_tracking_token("AB12CD34")
        );
    }
}
