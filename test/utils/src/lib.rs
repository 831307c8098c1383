use serde_json::json;

pub const USER_ID: &str = "6f1c1a52-3c0e-4c4e-9f0e-1b2d3c4d5e6f";
pub const COMPANY_ID: &str = "0b9a8c7d-6e5f-4a3b-8c2d-1e0f9a8b7c6d";
pub const CHAT_ID: &str = "3e7b1d2c-5a4f-4b6e-9d8c-7f6e5d4c3b2a";
pub const MESSAGE_ID: &str = "9a8b7c6d-5e4f-4a3b-8c1d-0e9f8a7b6c5d";
pub const TIMESTAMP: &str = "2024-03-01T09:30:00+00:00";

pub fn tokens_body(access_token: &str, refresh_token: &str) -> String {
    return json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "token_type": "bearer",
        "expires_in": 1800,
    })
    .to_string();
}

pub fn user_body() -> String {
    return json!({
        "id": USER_ID,
        "email": "agent@example.com",
        "name": "Dana Agent",
        "company_id": COMPANY_ID,
        "created_at": TIMESTAMP,
        "updated_at": TIMESTAMP,
    })
    .to_string();
}

pub fn chat_value(name: &str) -> serde_json::Value {
    return json!({
        "id": CHAT_ID,
        "name": name,
        "client_description": null,
        "special_instructions": null,
        "user_id": USER_ID,
        "company_id": COMPANY_ID,
        "created_at": TIMESTAMP,
        "updated_at": TIMESTAMP,
    });
}

pub fn message_value(role: &str, content: &str, is_ai_generated: bool) -> serde_json::Value {
    return json!({
        "id": MESSAGE_ID,
        "chat_id": CHAT_ID,
        "content": content,
        "role": role,
        "is_ai_generated": is_ai_generated,
        "created_at": TIMESTAMP,
        "updated_at": TIMESTAMP,
    });
}

pub fn transcript_fixture() -> &'static str {
    return r#"
CLIENT: Hi, I'm having trouble with my order. It hasn't arrived yet and it's been 2 weeks.

MANAGER: I'm sorry to hear about the delay with your order.
Let me look into this for you right away.

CLIENT: Thank you. My order number is #12345.

MANAGER: I've found your order and I can see there was an issue with the shipping.
"#
    .trim();
}
