//! Emergency help flow
//!
//! Triggering the flow makes one bounded attempt at a location fix and then
//! always offers the contact list. Choosing a contact drafts the alert text;
//! choosing an action hands it to the platform. Nothing here touches the
//! conversation state, and every failure degrades to a logged notice.

pub mod contacts;
pub mod dispatch;
pub mod location;

pub use contacts::{contact_list, ContactEntry, ContactKind, EmergencyContact, EmergencyServices};
pub use dispatch::{DispatchAction, LogOnlyLauncher, PlatformLauncher, SystemLauncher};
pub use location::{
    FixedLocation, GeolocationError, Location, LocationProvider, LocationRequest,
    UnavailableLocation,
};

use crate::{Result, SahayakError};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const NAME_PLACEHOLDER: &str = "[NAME]";
pub const LOCATION_PLACEHOLDER: &str = "[LOCATION]";

pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "EMERGENCY: [NAME] needs immediate assistance at [LOCATION]. This is an automated alert from Sahayak app.";

const UNKNOWN_LOCATION: &str = "an unknown location";
const NO_LOCATION_NOTE: &str = "Location could not be determined.";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencySettings {
    /// Show the call/chat/SMS choice instead of dialing right away
    pub confirm_before_calling: bool,
    pub attempt_geolocation: bool,
    pub location_timeout_secs: u64,
}

impl Default for EmergencySettings {
    fn default() -> Self {
        Self {
            confirm_before_calling: true,
            attempt_geolocation: true,
            location_timeout_secs: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    pub primary_contact: EmergencyContact,
    pub secondary_contacts: Vec<EmergencyContact>,
    pub services: EmergencyServices,
    /// Alert text with `[NAME]` and `[LOCATION]` placeholders
    pub message_template: String,
    pub settings: EmergencySettings,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        // Placeholder numbers; real contacts come from the config file
        Self {
            primary_contact: EmergencyContact::new(
                "Son/Daughter",
                "9000000001",
                "Primary caregiver",
            ),
            secondary_contacts: vec![EmergencyContact::new("Neighbor", "9000000002", "Neighbor")],
            services: EmergencyServices::default(),
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
            settings: EmergencySettings::default(),
        }
    }
}

impl EmergencyConfig {
    pub fn location_request(&self) -> LocationRequest {
        LocationRequest {
            timeout: Duration::from_secs(self.settings.location_timeout_secs),
            ..Default::default()
        }
    }
}

/// Fill in the template and append whatever is known about the location
pub fn build_alert_message(template: &str, name: &str, location: Option<&Location>) -> String {
    let place = match location {
        Some(loc) => format!("{}, {}", loc.latitude, loc.longitude),
        None => UNKNOWN_LOCATION.to_string(),
    };

    let mut message = template
        .replace(NAME_PLACEHOLDER, name)
        .replace(LOCATION_PLACEHOLDER, &place);

    match location {
        Some(loc) => {
            message.push_str(&format!("\n\nMy Location:\n{}", loc.maps_url()));
            message.push_str(&format!(
                "\n\nLocation Details:\n- Latitude: {}\n- Longitude: {}\n- Accuracy: {} meters\n- Timestamp: {}",
                loc.latitude,
                loc.longitude,
                loc.accuracy,
                loc.captured_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
            ));
        }
        None => {
            message.push_str("\n\n");
            message.push_str(NO_LOCATION_NOTE);
        }
    }

    message
}

/// Contact list presented after a trigger
#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyDialog {
    pub contacts: Vec<ContactEntry>,
    pub location: Option<Location>,
    /// Shown when the location attempt failed in a way the user should know about
    pub notice: Option<&'static str>,
}

/// Alert prepared for one contact, waiting for an action
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub contact: EmergencyContact,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum EmergencyStage {
    #[default]
    Closed,
    ChoosingContact,
    ChoosingAction(AlertDraft),
}

pub struct EmergencyFlow {
    config: EmergencyConfig,
    location_provider: Arc<dyn LocationProvider>,
    launcher: Arc<dyn PlatformLauncher>,
    location: Option<Location>,
    stage: EmergencyStage,
}

impl EmergencyFlow {
    pub fn new(
        config: EmergencyConfig,
        location_provider: Arc<dyn LocationProvider>,
        launcher: Arc<dyn PlatformLauncher>,
    ) -> Self {
        Self {
            config,
            location_provider,
            launcher,
            location: None,
            stage: EmergencyStage::Closed,
        }
    }

    pub fn config(&self) -> &EmergencyConfig {
        &self.config
    }

    pub fn stage(&self) -> &EmergencyStage {
        &self.stage
    }

    pub fn is_open(&self) -> bool {
        self.stage != EmergencyStage::Closed
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn contacts(&self) -> Vec<ContactEntry> {
        contact_list(
            &self.config.primary_contact,
            &self.config.secondary_contacts,
            &self.config.services,
        )
    }

    /// Open the dialog. Location is best effort and never blocks the contact list.
    pub async fn trigger(&mut self) -> EmergencyDialog {
        info!("Emergency help requested");
        self.location = None;

        let notice = if self.config.settings.attempt_geolocation {
            let request = self.config.location_request();
            match location::acquire(self.location_provider.as_ref(), &request).await {
                Ok(location) => {
                    self.location = Some(location);
                    None
                }
                Err(e) => e.user_notice(),
            }
        } else {
            warn!("Geolocation disabled; alerts will not include a location");
            None
        };

        self.stage = EmergencyStage::ChoosingContact;

        EmergencyDialog {
            contacts: self.contacts(),
            location: self.location,
            notice,
        }
    }

    /// Pick a contact by its position in the dialog
    pub fn select_contact(&mut self, index: usize) -> Result<AlertDraft> {
        if self.stage != EmergencyStage::ChoosingContact {
            return Err(SahayakError::DispatchError(
                "No emergency contact list is open".to_string(),
            ));
        }

        let entry = self.contacts().into_iter().nth(index).ok_or_else(|| {
            SahayakError::DispatchError(format!("No emergency contact number {}", index + 1))
        })?;

        info!("Emergency contact selected: {}", entry.contact.name);

        let draft = AlertDraft {
            message: build_alert_message(
                &self.config.message_template,
                &entry.contact.name,
                self.location.as_ref(),
            ),
            contact: entry.contact,
        };
        self.stage = EmergencyStage::ChoosingAction(draft.clone());
        Ok(draft)
    }

    /// Launch `action` for the drafted alert. The dialog stays open on failure.
    pub fn dispatch(&mut self, action: DispatchAction) -> Result<String> {
        let EmergencyStage::ChoosingAction(draft) = &self.stage else {
            return Err(SahayakError::DispatchError(
                "No emergency contact has been chosen".to_string(),
            ));
        };

        let uri = action.uri(&draft.contact.phone, &draft.message);
        if let Err(e) = self.launcher.launch(&uri) {
            error!("Error during {} to {}: {}", action.label(), draft.contact.name, e);
            return Err(e);
        }

        info!("{} started for {}", action.label(), draft.contact.name);
        self.stage = EmergencyStage::Closed;
        Ok(uri)
    }

    /// Close whichever dialog is showing
    pub fn cancel(&mut self) -> bool {
        let was_open = self.is_open();
        self.stage = EmergencyStage::Closed;
        was_open
    }
}
