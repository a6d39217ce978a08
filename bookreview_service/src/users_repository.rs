use crate::api::UserId;

#[derive(thiserror::Error, Debug)]
pub enum UsersRepositoryError {
    #[error("User {0} not found")]
    NotFound(UserId),

    #[error("Username {0} already taken")]
    UsernameTaken(String),

    #[error("Database failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

/// A provisioned account. Tokens are opaque and issued out of band.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
}

#[async_trait::async_trait]
pub trait UsersRepository: Send + Sync {
    async fn add_user(&self, username: &str, token: &str) -> Result<UserId, UsersRepositoryError>;

    async fn get_user(&self, user_id: UserId) -> Result<UserAccount, UsersRepositoryError>;

    /// Resolves an api token to its account, `None` when the token is unknown.
    async fn find_user_by_token(
        &self,
        token: &str,
    ) -> Result<Option<UserAccount>, UsersRepositoryError>;
}
