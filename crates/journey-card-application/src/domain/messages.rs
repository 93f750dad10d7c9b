//! Customer-facing message templates.
//!
//! Templates are plain data keyed by locale and journey step. Placeholders
//! are `{tracking_id}` and `{remaining}`.

use std::str::FromStr;

use journey_core::error::DomainError;

use super::state::JourneyStep;

/// Supported message locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Tr,
    En,
}

impl FromStr for Locale {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tr" | "tr-tr" => Ok(Self::Tr),
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            other => Err(DomainError::Validation(format!("unsupported locale: {other}"))),
        }
    }
}

/// Length of the customer id fragment used as tracking id.
pub const TRACKING_ID_LENGTH: usize = 8;

const TEMPLATES: &[(Locale, JourneyStep, &str)] = &[
    (
        Locale::Tr,
        JourneyStep::Applied,
        "Başvurunuz alındı! Tracking ID: {tracking_id}",
    ),
    (
        Locale::Tr,
        JourneyStep::DocumentPending,
        "Lütfen {remaining} adet belge yükleyin.",
    ),
    (
        Locale::Tr,
        JourneyStep::UnderReview,
        "Başvurunuz inceleniyor, 24 saat içinde sonuç alacaksınız.",
    ),
    (
        Locale::Tr,
        JourneyStep::Approved,
        "🎉 Tebrikler! Kredi kartınız onaylandı.",
    ),
    (
        Locale::Tr,
        JourneyStep::Rejected,
        "Üzgünüz, başvurunuz şu anda onaylanamadı.",
    ),
    (
        Locale::En,
        JourneyStep::Applied,
        "Your application has been received! Tracking ID: {tracking_id}",
    ),
    (
        Locale::En,
        JourneyStep::DocumentPending,
        "Please upload {remaining} more document(s).",
    ),
    (
        Locale::En,
        JourneyStep::UnderReview,
        "Your application is under review; you will hear from us within 24 hours.",
    ),
    (
        Locale::En,
        JourneyStep::Approved,
        "🎉 Congratulations! Your credit card has been approved.",
    ),
    (
        Locale::En,
        JourneyStep::Rejected,
        "We are sorry, your application could not be approved at this time.",
    ),
];

const VIP_ADDENDA: &[(Locale, &str)] = &[
    (
        Locale::Tr,
        " 🌟 VIP müşterimizsiniz! Kartınız 2 iş günü içinde adresinize ulaşacak.",
    ),
    (
        Locale::En,
        " 🌟 As a VIP customer, your card will reach you within 2 business days.",
    ),
];

/// Looks up message templates for one locale.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCatalog {
    locale: Locale,
}

impl MessageCatalog {
    #[must_use]
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    #[must_use]
    pub fn locale(self) -> Locale {
        self.locale
    }

    /// Raw template for `step`.
    #[must_use]
    pub fn template(self, step: JourneyStep) -> &'static str {
        TEMPLATES
            .iter()
            .find(|(locale, s, _)| *locale == self.locale && *s == step)
            .map_or("", |(_, _, text)| *text)
    }

    #[must_use]
    pub fn vip_addendum(self) -> &'static str {
        VIP_ADDENDA
            .iter()
            .find(|(locale, _)| *locale == self.locale)
            .map_or("", |(_, text)| *text)
    }

    /// Fills the template for `step` with the given parameters.
    #[must_use]
    pub fn render(self, step: JourneyStep, customer_id: &str, remaining_documents: u32) -> String {
        let tracking_id: String = customer_id.chars().take(TRACKING_ID_LENGTH).collect();
        self.template(step)
            .replace("{tracking_id}", &tracking_id)
            .replace("{remaining}", &remaining_documents.to_string())
    }
}
