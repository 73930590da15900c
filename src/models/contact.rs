use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TripError};

/// A trusted contact who can receive a tracking link for a trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub owner: Uuid,
    pub name: String,
    pub phone: String,
}

/// Composes the outbound share message carrying a trip's tracking link.
///
/// Sharing requires at least one configured contact; the error is surfaced
/// to the user before any message is sent.
pub fn share_message(contacts: &[Contact], base_url: &str, trip_id: Uuid) -> Result<String> {
    if contacts.is_empty() {
        return Err(TripError::NoContacts);
    }
    Ok(format!(
        "I started a SafeWalk trip. Follow my live location: {}/track/{}",
        base_url.trim_end_matches('/'),
        trip_id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_message_includes_tracking_link() {
        let owner = Uuid::new_v4();
        let contacts = vec![Contact {
            id: Uuid::new_v4(),
            owner,
            name: "Asha".to_string(),
            phone: "+91-9000000000".to_string(),
        }];
        let trip_id = Uuid::new_v4();
        let msg = share_message(&contacts, "https://safewalk.example/", trip_id).unwrap();
        assert!(msg.contains(&format!("https://safewalk.example/track/{trip_id}")));
    }

    #[test]
    fn share_requires_a_contact() {
        let err = share_message(&[], "https://safewalk.example", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, TripError::NoContacts));
    }
}
