//! Department enumeration.

use serde::{Deserialize, Serialize};

/// Departments a user may belong to.
///
/// Stored and serialized by display name. Parsing is case-insensitive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Department {
    #[serde(rename = "IT")]
    It,
    #[serde(rename = "Receiving")]
    Receiving,
    #[serde(rename = "Barangay Affairs")]
    BarangayAffairs,
    #[serde(rename = "Financial Assistance")]
    FinancialAssistance,
    #[serde(rename = "Use of Facilities")]
    UseOfFacilities,
    #[serde(rename = "Appointment Meeting")]
    AppointmentMeeting,
    #[serde(rename = "Use of Vehicle")]
    UseOfVehicle,
    #[serde(rename = "Other Request")]
    OtherRequest,
}

impl Department {
    pub const ALL: [Department; 8] = [
        Department::It,
        Department::Receiving,
        Department::BarangayAffairs,
        Department::FinancialAssistance,
        Department::UseOfFacilities,
        Department::AppointmentMeeting,
        Department::UseOfVehicle,
        Department::OtherRequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::It => "IT",
            Department::Receiving => "Receiving",
            Department::BarangayAffairs => "Barangay Affairs",
            Department::FinancialAssistance => "Financial Assistance",
            Department::UseOfFacilities => "Use of Facilities",
            Department::AppointmentMeeting => "Appointment Meeting",
            Department::UseOfVehicle => "Use of Vehicle",
            Department::OtherRequest => "Other Request",
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn parse(value: &str) -> Option<Department> {
        let needle = value.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(needle))
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
