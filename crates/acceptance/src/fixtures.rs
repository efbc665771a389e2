//! Randomized test users
//!
//! Every scenario registers its own user so scenarios never depend on each
//! other's data. Usernames are tracked process-wide and never handed out twice.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::AdminCredentials;

const USERNAME_PREFIX: &str = "user_";
const USERNAME_DIGITS: usize = 8;
const PHONE_PREFIX: &str = "3";
const PHONE_DIGITS: usize = 9;
const PASSWORD_BASE: &str = "Passw0rd*";
const PASSWORD_DIGITS: usize = 3;

const FIRST_NAMES: &[&str] = &[
    "Ana", "Carlos", "Daniela", "Felipe", "Laura", "Mateo", "Sofia", "Juan", "Valeria", "Andres",
];
const LAST_NAMES: &[&str] = &[
    "Gomez", "Rodriguez", "Martinez", "Lopez", "Garcia", "Hernandez", "Ramirez", "Torres",
];

static ISSUED_USERNAMES: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

/// A user record for one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestUser {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl TestUser {
    /// Registration payload in the auth service's field naming
    pub fn registration_body(&self) -> serde_json::Value {
        serde_json::json!({
            "usuario": self.username,
            "correo": self.email,
            "numeroTelefono": self.phone,
            "clave": self.password,
            "nombres": self.first_name,
            "apellidos": self.last_name,
        })
    }
}

pub struct FixtureGenerator {
    rng: StdRng,
}

impl Default for FixtureGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic stream, for tests. Usernames stay unique process-wide.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn new_user(&mut self) -> TestUser {
        let username = self.unique_username();
        let first_name = self.pick(FIRST_NAMES);
        let last_name = self.pick(LAST_NAMES);
        let email = format!(
            "{}.{}{}@example.com",
            first_name.to_lowercase(),
            last_name.to_lowercase(),
            self.digits(4)
        );

        TestUser {
            username,
            email,
            phone: format!("{PHONE_PREFIX}{}", self.digits(PHONE_DIGITS)),
            password: format!("{PASSWORD_BASE}{}", self.digits(PASSWORD_DIGITS)),
            first_name,
            last_name,
            role: Role::User,
        }
    }

    /// The configured admin account, filled out with generated contact data
    pub fn admin(&mut self, credentials: &AdminCredentials) -> TestUser {
        let mut user = self.new_user();
        user.username = credentials.username.clone();
        user.password = credentials.password.clone();
        user.role = Role::Admin;
        user
    }

    fn unique_username(&mut self) -> String {
        let mut issued = ISSUED_USERNAMES.lock();
        loop {
            let candidate = format!("{USERNAME_PREFIX}{}", self.digits(USERNAME_DIGITS));
            if issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    fn digits(&mut self, count: usize) -> String {
        (0..count)
            .map(|_| char::from(b'0' + self.rng.gen_range(0..10u8)))
            .collect()
    }

    fn pick(&mut self, names: &[&str]) -> String {
        names
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("Test")
            .to_string()
    }
}
