use super::User;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub is_authenticated: bool,
    pub current_user: Option<User>,
}

impl Session {
    pub fn authenticated(user: User) -> Session {
        return Session {
            is_authenticated: true,
            current_user: Some(user),
        };
    }

    pub fn anonymous() -> Session {
        return Session::default();
    }
}
