use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::RngCore;
use sqlx::{Acquire, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::{is_unique_violation, AppError},
    models::{
        auth::{AuthenticatedUser, Claims},
        institution::{Institution, InviteCodeResponse, MemberProfile},
        user::{
            LoginResponse, ParentSummary, RegisterRequest, RegisterResponse, User, UserProfile,
            UserRole,
        },
    },
};

/// Candidate codes drawn per allocation round; a full round of collisions is
/// retried with fresh draws.
const INVITE_CODE_CANDIDATES: usize = 8;
const INVITE_CODE_ROUNDS: usize = 3;

const SELECT_USER: &str = "SELECT id, username, password_hash, role, real_name, phone, \
     organization, institution_id, is_active, created_at, updated_at FROM users";

/// 8 uppercase hex characters from 4 CSPRNG bytes.
pub fn generate_invite_code() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode_upper(bytes)
}

/// First candidate not already present in `taken`. The database unique
/// constraint remains the final arbiter under concurrent registration.
pub fn first_available_code(candidates: Vec<String>, taken: &[String]) -> Option<String> {
    candidates
        .into_iter()
        .find(|c| !taken.iter().any(|t| t == c))
}

pub struct AuthService;

impl AuthService {
    pub async fn register(pool: &PgPool, req: &RegisterRequest) -> Result<RegisterResponse, AppError> {
        if req.username.trim().is_empty() || req.password.is_empty() {
            return Err(AppError::validation("Username and password are required"));
        }
        if req.role == UserRole::Admin {
            return Err(AppError::validation("Cannot register with this role"));
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(&req.username)
                .fetch_one(pool)
                .await?;
        if exists {
            return Err(AppError::conflict("Username is already taken"));
        }

        let password_hash = bcrypt::hash(&req.password, 12)
            .map_err(|e| AppError::Internal(e.into()))?;

        if req.role == UserRole::Institution {
            return Self::register_institution(pool, req, &password_hash).await;
        }

        let user_id = Self::insert_user(pool, req, &password_hash, None).await?;
        Ok(RegisterResponse {
            user_id,
            invite_code: None,
            institution_name: None,
        })
    }

    /// Institution registration has two mutually exclusive modes: join an
    /// existing tenant by invite code, or create a new tenant. Creation runs
    /// user + institution + back-link in one transaction.
    async fn register_institution(
        pool: &PgPool,
        req: &RegisterRequest,
        password_hash: &str,
    ) -> Result<RegisterResponse, AppError> {
        let create_mode = req.is_new_institution && req.organization.is_some();
        match (&req.invite_code, create_mode) {
            (Some(_), true) => Err(AppError::validation(
                "Choose either a new institution or an invite code, not both",
            )),
            (None, false) => Err(AppError::validation(
                "Either create a new institution or supply an invite code",
            )),
            (Some(code), false) => {
                // Codes are stored uppercase; accept any casing on input.
                let code = code.trim().to_uppercase();
                let institution_id: Option<Uuid> = sqlx::query_scalar(
                    "SELECT id FROM institutions WHERE invite_code = $1",
                )
                .bind(&code)
                .fetch_optional(pool)
                .await?;
                let institution_id = institution_id
                    .ok_or_else(|| AppError::validation("Invalid invite code"))?;

                let user_id = Self::insert_user(pool, req, password_hash, Some(institution_id)).await?;
                Ok(RegisterResponse {
                    user_id,
                    invite_code: None,
                    institution_name: None,
                })
            }
            (None, true) => {
                let organization = req.organization.as_deref().unwrap_or_default();
                let mut tx = pool.begin().await?;

                let user_id: Uuid = sqlx::query_scalar(
                    "INSERT INTO users (username, password_hash, role, real_name, phone, organization)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     RETURNING id",
                )
                .bind(&req.username)
                .bind(password_hash)
                .bind(req.role.to_string())
                .bind(&req.real_name)
                .bind(&req.phone)
                .bind(&req.organization)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_duplicate_username)?;

                let institution =
                    Self::create_institution(&mut tx, req, organization, user_id).await?;

                sqlx::query("UPDATE users SET institution_id = $1 WHERE id = $2")
                    .bind(institution.id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;

                tx.commit().await?;

                Ok(RegisterResponse {
                    user_id,
                    invite_code: Some(institution.invite_code),
                    institution_name: Some(institution.name),
                })
            }
        }
    }

    /// Allocate a unique invite code and insert the tenant. Collisions with
    /// concurrent registrations surface as unique violations inside a
    /// savepoint and trigger a fresh allocation round.
    async fn create_institution(
        tx: &mut Transaction<'_, Postgres>,
        req: &RegisterRequest,
        name: &str,
        created_by: Uuid,
    ) -> Result<Institution, AppError> {
        for _ in 0..INVITE_CODE_ROUNDS {
            let candidates: Vec<String> =
                (0..INVITE_CODE_CANDIDATES).map(|_| generate_invite_code()).collect();
            let taken: Vec<String> = sqlx::query_scalar(
                "SELECT invite_code FROM institutions WHERE invite_code = ANY($1)",
            )
            .bind(&candidates)
            .fetch_all(&mut **tx)
            .await?;
            let Some(code) = first_available_code(candidates, &taken) else {
                continue;
            };

            let mut sp = tx.begin().await?;
            let inserted = sqlx::query_as::<_, Institution>(
                "INSERT INTO institutions (name, contact_person, contact_phone, invite_code, created_by)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING *",
            )
            .bind(name)
            .bind(&req.real_name)
            .bind(&req.phone)
            .bind(&code)
            .bind(created_by)
            .fetch_one(&mut *sp)
            .await;

            match inserted {
                Ok(institution) => {
                    sp.commit().await?;
                    return Ok(institution);
                }
                Err(e) if is_unique_violation(&e) => {
                    sp.rollback().await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AppError::conflict("Could not allocate a unique invite code"))
    }

    async fn insert_user(
        pool: &PgPool,
        req: &RegisterRequest,
        password_hash: &str,
        institution_id: Option<Uuid>,
    ) -> Result<Uuid, AppError> {
        sqlx::query_scalar(
            "INSERT INTO users (username, password_hash, role, real_name, phone, organization, institution_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(&req.username)
        .bind(password_hash)
        .bind(req.role.to_string())
        .bind(&req.real_name)
        .bind(&req.phone)
        .bind(&req.organization)
        .bind(institution_id)
        .fetch_one(pool)
        .await
        .map_err(map_duplicate_username)
    }

    /// Identity-not-found and secret-mismatch produce the same error, so
    /// login cannot be used to enumerate usernames.
    pub async fn login(
        pool: &PgPool,
        username: &str,
        password: &str,
        jwt_secret: &str,
        ttl_seconds: u64,
    ) -> Result<LoginResponse, AppError> {
        let user = sqlx::query_as::<_, User>(
            &format!("{SELECT_USER} WHERE username = $1 AND is_active = TRUE"),
        )
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|_| AppError::InvalidCredentials)?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let role: UserRole = user.role.parse().map_err(AppError::Internal)?;

        let mut institution_name = None;
        if role == UserRole::Institution {
            if let Some(institution_id) = user.institution_id {
                institution_name = sqlx::query_scalar(
                    "SELECT name FROM institutions WHERE id = $1",
                )
                .bind(institution_id)
                .fetch_optional(pool)
                .await?;
            }
        }

        let token = Self::generate_session_token(
            user.id,
            &user.username,
            role,
            user.institution_id.filter(|_| role == UserRole::Institution),
            jwt_secret,
            ttl_seconds,
        )?;

        Ok(LoginResponse {
            token,
            user: user.into(),
            institution_name,
        })
    }

    pub async fn me(pool: &PgPool, user_id: Uuid) -> Result<(UserProfile, Option<Institution>), AppError> {
        let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut institution = None;
        if user.role == UserRole::Institution.to_string() {
            if let Some(institution_id) = user.institution_id {
                institution = sqlx::query_as::<_, Institution>(
                    "SELECT * FROM institutions WHERE id = $1",
                )
                .bind(institution_id)
                .fetch_optional(pool)
                .await?;
            }
        }

        Ok((user.into(), institution))
    }

    pub async fn invite_code(
        pool: &PgPool,
        principal: &AuthenticatedUser,
    ) -> Result<InviteCodeResponse, AppError> {
        let institution_id = principal.institution_id.ok_or(AppError::Forbidden)?;
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT invite_code, name FROM institutions WHERE id = $1",
        )
        .bind(institution_id)
        .fetch_optional(pool)
        .await?;
        let (invite_code, institution_name) = row.ok_or(AppError::NotFound)?;
        Ok(InviteCodeResponse {
            invite_code,
            institution_name,
        })
    }

    /// All staff accounts attached to the principal's tenant.
    pub async fn members(
        pool: &PgPool,
        principal: &AuthenticatedUser,
    ) -> Result<Vec<MemberProfile>, AppError> {
        let institution_id = principal.institution_id.ok_or(AppError::Forbidden)?;
        let members = sqlx::query_as::<_, MemberProfile>(
            "SELECT id, username, real_name, phone, created_at
             FROM users
             WHERE institution_id = $1 AND role = 'institution'
             ORDER BY created_at ASC",
        )
        .bind(institution_id)
        .fetch_all(pool)
        .await?;
        Ok(members)
    }

    /// Searchable parent directory, used by institutions to link children.
    pub async fn list_parents(
        pool: &PgPool,
        search: Option<&str>,
    ) -> Result<Vec<ParentSummary>, AppError> {
        let mut qb = sqlx::QueryBuilder::new(
            "SELECT id, username, real_name, phone FROM users WHERE role = 'parent'",
        );
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            let pattern = format!("%{term}%");
            qb.push(" AND (real_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR phone ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR username ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
        qb.push(" ORDER BY real_name ASC");
        let parents = qb.build_query_as::<ParentSummary>().fetch_all(pool).await?;
        Ok(parents)
    }

    pub fn generate_session_token(
        user_id: Uuid,
        username: &str,
        role: UserRole,
        institution_id: Option<Uuid>,
        secret: &str,
        ttl_seconds: u64,
    ) -> Result<String, AppError> {
        let now = Utc::now().timestamp() as usize;
        Self::generate_session_token_at(user_id, username, role, institution_id, secret, ttl_seconds, now)
    }

    pub fn generate_session_token_at(
        user_id: Uuid,
        username: &str,
        role: UserRole,
        institution_id: Option<Uuid>,
        secret: &str,
        ttl_seconds: u64,
        issued_at: usize,
    ) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role,
            institution_id,
            iat: issued_at,
            exp: issued_at + ttl_seconds as usize,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(e.into()))
    }
}

fn map_duplicate_username(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::conflict("Username is already taken")
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_code_shape() {
        for _ in 0..50 {
            let code = generate_invite_code();
            assert_eq!(code.len(), 8);
            assert!(code.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        }
    }

    #[test]
    fn collision_skips_taken_candidates() {
        let candidates = vec!["AAAA0001".to_string(), "AAAA0002".to_string(), "AAAA0003".to_string()];
        let taken = vec!["AAAA0001".to_string(), "AAAA0002".to_string()];
        assert_eq!(
            first_available_code(candidates, &taken),
            Some("AAAA0003".to_string())
        );
    }

    #[test]
    fn full_collision_round_yields_none() {
        let candidates = vec!["AAAA0001".to_string()];
        let taken = vec!["AAAA0001".to_string()];
        assert_eq!(first_available_code(candidates, &taken), None);
    }
}
