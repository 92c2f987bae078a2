//! # Fetch Battery
//!
//! The initial requests issued once per successful connection. Each entry is
//! tracked by the loading barrier under its [`FetchName`] until answered.

use crate::authorization::{check, permissions, Rules};
use crate::barrier::FetchName;
use crate::protocol::Request;
use crate::session::Identity;

/// Tables joined into every contact on the initial fetch.
pub const CONTACT_TABLES: [&str; 2] = ["Demographic", "Passport"];

/// One battery entry: the fetch it answers and the permissions it needs.
struct BatteryEntry {
    name: FetchName,
    required: &'static [&'static str],
    request: fn() -> Request,
}

fn get_theme() -> Request {
    Request::GetTheme
}

fn get_contacts() -> Request {
    Request::GetContacts {
        additional_tables: CONTACT_TABLES.iter().map(|t| (*t).to_string()).collect(),
    }
}

fn get_credentials() -> Request {
    Request::GetCredentials
}

fn get_roles() -> Request {
    Request::GetRoles
}

fn get_organization_name() -> Request {
    Request::GetOrganizationName
}

fn get_images() -> Request {
    Request::GetImages
}

fn get_users() -> Request {
    Request::GetUsers
}

const BATTERY: &[BatteryEntry] = &[
    BatteryEntry {
        name: FetchName::Theme,
        required: &[],
        request: get_theme,
    },
    BatteryEntry {
        name: FetchName::Contacts,
        required: &[permissions::CONTACTS_READ, permissions::DEMOGRAPHICS_READ],
        request: get_contacts,
    },
    BatteryEntry {
        name: FetchName::Credentials,
        required: &[permissions::CREDENTIALS_READ],
        request: get_credentials,
    },
    BatteryEntry {
        name: FetchName::Roles,
        required: &[permissions::ROLES_READ],
        request: get_roles,
    },
    BatteryEntry {
        name: FetchName::Organization,
        required: &[],
        request: get_organization_name,
    },
    BatteryEntry {
        name: FetchName::Logo,
        required: &[],
        request: get_images,
    },
    BatteryEntry {
        name: FetchName::Users,
        required: &[permissions::USERS_READ],
        request: get_users,
    },
];

/// Requests to issue on connect for this identity, in send order.
pub fn fetch_battery(rules: &Rules, identity: Option<&Identity>) -> Vec<(FetchName, Request)> {
    BATTERY
        .iter()
        .filter(|entry| check(rules, identity, entry.required))
        .map(|entry| (entry.name, (entry.request)()))
        .collect()
}
