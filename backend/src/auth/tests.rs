use super::*;
use jsonwebtoken::{EncodingKey, Header, encode};

const SECRET: &str = "supersecretjwtsecretforunittesting123";

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    role: String,
    email: Option<String>,
    aud: String,
    exp: usize,
}

fn token(secret: &str, aud: &str, exp: usize) -> String {
    let claims = TestClaims {
        sub: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        role: "authenticated".to_string(),
        email: Some("test@example.com".to_string()),
        aud: aud.to_string(),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[test]
fn test_validate_jwt_success() {
    let claims = validate_jwt(&token(SECRET, "authenticated", 9999999999), SECRET)
        .expect("Valid token should pass");

    assert_eq!(claims.sub, "123e4567-e89b-12d3-a456-426614174000");
    assert_eq!(claims.email.as_deref(), Some("test@example.com"));
    assert_eq!(claims.role.as_deref(), Some("authenticated"));
}

#[test]
fn test_validate_jwt_expired() {
    let result = validate_jwt(&token(SECRET, "authenticated", 1), SECRET);
    assert!(result.is_err());
}

#[test]
fn test_validate_jwt_invalid_signature() {
    let result = validate_jwt(&token("wrongsecret", "authenticated", 9999999999), SECRET);
    assert!(result.is_err());
}

#[test]
fn test_validate_jwt_wrong_audience() {
    let result = validate_jwt(&token(SECRET, "service_role", 9999999999), SECRET);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_extractor_reads_bearer_token() {
    let request = axum::http::Request::builder()
        .header(
            AUTHORIZATION,
            format!("Bearer {}", token(SECRET, "authenticated", 9999999999)),
        )
        .extension(Arc::new(AuthSettings {
            jwt_secret: SECRET.to_string(),
        }))
        .body(())
        .unwrap();
    let (mut parts, _) = request.into_parts();

    let user = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(
        user.user_id,
        Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap()
    );
}

#[tokio::test]
async fn test_extractor_rejects_missing_header() {
    let request = axum::http::Request::builder()
        .extension(Arc::new(AuthSettings {
            jwt_secret: SECRET.to_string(),
        }))
        .body(())
        .unwrap();
    let (mut parts, _) = request.into_parts();

    let result = AuthUser::from_request_parts(&mut parts, &()).await;
    assert!(result.is_err());
}
