//! RFC 8628 device authorization: code request, token polling, issued token.

pub mod device_code;
pub mod poll;
pub mod token;

pub use device_code::{DeviceCodeGrant, DeviceCodeRequester};
pub use poll::{AccessTokenPoller, ErrorCode, PollOutcome, PollState, DEVICE_CODE_GRANT_TYPE};
pub use token::AccessToken;
