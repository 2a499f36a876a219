//! Emergency contact configuration and the contact list offered to the user

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relationship: String,
}

impl EmergencyContact {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            relationship: relationship.into(),
        }
    }
}

/// Public emergency service numbers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyServices {
    pub ambulance: String,
    pub police: String,
    pub helpline: String,
}

impl Default for EmergencyServices {
    fn default() -> Self {
        Self {
            ambulance: "108".to_string(),
            police: "100".to_string(),
            helpline: "112".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    Primary,
    Secondary,
    Service,
}

/// One selectable row of the emergency dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEntry {
    pub kind: ContactKind,
    pub contact: EmergencyContact,
}

/// Primary contact, secondary contacts, then ambulance and helpline
pub fn contact_list(
    primary: &EmergencyContact,
    secondary: &[EmergencyContact],
    services: &EmergencyServices,
) -> Vec<ContactEntry> {
    let mut entries = vec![ContactEntry {
        kind: ContactKind::Primary,
        contact: primary.clone(),
    }];

    entries.extend(secondary.iter().map(|contact| ContactEntry {
        kind: ContactKind::Secondary,
        contact: contact.clone(),
    }));

    entries.push(ContactEntry {
        kind: ContactKind::Service,
        contact: EmergencyContact::new(
            "Ambulance",
            services.ambulance.clone(),
            "Emergency Medical Service",
        ),
    });
    entries.push(ContactEntry {
        kind: ContactKind::Service,
        contact: EmergencyContact::new(
            "Emergency Helpline",
            services.helpline.clone(),
            "General Emergency",
        ),
    });

    entries
}
