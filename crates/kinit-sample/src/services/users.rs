use crate::error::DeskError;
use crate::model::{User, UserCreate, UserId};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use tracing::info;

/// Registered customers.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: RefCell<BTreeMap<UserId, User>>,
    next_id: Cell<u32>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, params: UserCreate) -> UserId {
        let id = UserId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        info!(user_id = %id, "User registered");
        self.users.borrow_mut().insert(id, User::new(id, params));
        id
    }

    pub fn get(&self, id: UserId) -> Result<User, DeskError> {
        self.users
            .borrow()
            .get(&id)
            .cloned()
            .ok_or(DeskError::UnknownUser(id))
    }

    pub fn len(&self) -> usize {
        self.users.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_assigns_sequential_ids() {
        let users = UserDirectory::new();
        let alice = users.register(UserCreate {
            name: "Alice".into(),
            email: "alice@example.com".into(),
        });
        let bob = users.register(UserCreate {
            name: "Bob".into(),
            email: "bob@example.com".into(),
        });
        assert_eq!((alice, bob), (UserId(1), UserId(2)));
        assert_eq!(users.get(alice).unwrap().email, "alice@example.com");
        assert_eq!(users.get(UserId(3)), Err(DeskError::UnknownUser(UserId(3))));
    }
}
