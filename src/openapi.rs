use utoipa::OpenApi;

use crate::handlers::messages;
use crate::models::{ConversationSummary, Message};

#[derive(OpenApi)]
#[openapi(
    paths(
        messages::post_message,
        messages::get_messages,
        messages::get_conversations,
    ),
    components(schemas(Message, ConversationSummary, messages::CreateMessageBody)),
    tags((name = "messages", description = "Direct messages"))
)]
pub struct ApiDoc;
