use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Verifies Telegram WebApp `initData` and returns the signed user id.
///
/// The data-check-string is every field except `hash`, URL-decoded, sorted by
/// key and joined with `\n`; it is signed with `HMAC(HMAC("WebAppData", token))`.
pub fn verify_init_data(init_data: &str, bot_token: &str) -> Option<i64> {
    let mut hash: Option<String> = None;
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (key, value) in url::form_urlencoded::parse(init_data.as_bytes()) {
        if key == "hash" {
            hash = Some(value.into_owned());
        } else {
            pairs.push((key.into_owned(), value.into_owned()));
        }
    }
    let hash = hex::decode(hash?).ok()?;

    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let data_check_string = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n");

    let expected = sign(&data_check_string, bot_token)?;
    if !bool::from(expected.as_slice().ct_eq(hash.as_slice())) {
        return None;
    }

    let user = pairs.iter().find(|(k, _)| k == "user")?;
    let user: serde_json::Value = serde_json::from_str(&user.1).ok()?;
    user.get("id")?.as_i64()
}

fn sign(data_check_string: &str, bot_token: &str) -> Option<Vec<u8>> {
    let mut secret = HmacSha256::new_from_slice(b"WebAppData").ok()?;
    secret.update(bot_token.as_bytes());
    let secret_key = secret.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret_key).ok()?;
    mac.update(data_check_string.as_bytes());
    Some(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
pub(crate) fn signed_init_data(user_id: i64, bot_token: &str) -> String {
    let user = serde_json::json!({ "id": user_id, "first_name": "Test" }).to_string();
    let auth_date = "1700000000";
    let data_check_string = format!("auth_date={}\nuser={}", auth_date, user);
    let hash = hex::encode(sign(&data_check_string, bot_token).unwrap_or_default());
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("user", &user)
        .append_pair("auth_date", auth_date)
        .append_pair("hash", &hash)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_correctly_signed_data() {
        let data = signed_init_data(42, "123:abc");
        assert_eq!(verify_init_data(&data, "123:abc"), Some(42));
    }

    #[test]
    fn rejects_wrong_token_or_tampering() {
        let data = signed_init_data(42, "123:abc");
        assert_eq!(verify_init_data(&data, "123:other"), None);

        let tampered = data.replace("auth_date=1700000000", "auth_date=1700000001");
        assert_eq!(verify_init_data(&tampered, "123:abc"), None);
        assert_eq!(verify_init_data("user=%7B%22id%22%3A42%7D", "123:abc"), None);
    }
}
