use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("user {0} already exists")]
    AlreadyExists(String),
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("cannot hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("user store lock is poisoned")]
    Poisoned,
}

/// Access level checked against each method's allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
        }
    }
}

impl FromStr for Role {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(UserError::UnknownRole(s.to_string())),
        }
    }
}

/// A credential record. Only the bcrypt digest of the password is kept.
#[derive(Clone, PartialEq)]
pub struct User {
    pub username: String,
    pub role: Role,
    hashed_password: String,
}

impl User {
    pub fn new(username: &str, password: &str, role: Role) -> Result<User, UserError> {
        User::with_cost(username, password, role, bcrypt::DEFAULT_COST)
    }

    /// Like `new`, with an explicit bcrypt work factor
    pub fn with_cost(username: &str, password: &str, role: Role, cost: u32) -> Result<User, UserError> {
        Ok(User {
            username: username.to_string(),
            role,
            hashed_password: bcrypt::hash(password, cost)?,
        })
    }

    pub fn is_correct_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.hashed_password).unwrap_or(false)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish()
    }
}

pub trait UserStore: Send + Sync {
    /// Inserts a user unless the username is taken
    fn save(&self, user: &User) -> Result<(), UserError>;

    /// Absence is not an error
    fn find(&self, username: &str) -> Result<Option<User>, UserError>;
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> InMemoryUserStore {
        InMemoryUserStore::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn save(&self, user: &User) -> Result<(), UserError> {
        let mut users = self.users.write().map_err(|_| UserError::Poisoned)?;
        if users.contains_key(&user.username) {
            return Err(UserError::AlreadyExists(user.username.clone()));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    fn find(&self, username: &str) -> Result<Option<User>, UserError> {
        let users = self.users.read().map_err(|_| UserError::Poisoned)?;
        Ok(users.get(username).cloned())
    }
}

/// Creates the `admin1` and `user1` accounts every fresh server starts with
pub fn seed_users(store: &dyn UserStore, cost: u32) -> Result<(), UserError> {
    store.save(&User::with_cost("admin1", "secret", Role::Admin, cost)?)?;
    store.save(&User::with_cost("user1", "secret", Role::User, cost)?)
}
