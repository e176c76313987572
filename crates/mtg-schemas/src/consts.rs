//! Terminal protocol constants.
//!
//! Values match the terminal's own enumerations; they travel on the wire as
//! plain integers.

// Order types
pub const ORDER_TYPE_BUY: u32 = 0;
pub const ORDER_TYPE_SELL: u32 = 1;
pub const ORDER_TYPE_BUY_LIMIT: u32 = 2;
pub const ORDER_TYPE_SELL_LIMIT: u32 = 3;
pub const ORDER_TYPE_BUY_STOP: u32 = 4;
pub const ORDER_TYPE_SELL_STOP: u32 = 5;
pub const ORDER_TYPE_BUY_STOP_LIMIT: u32 = 6;
pub const ORDER_TYPE_SELL_STOP_LIMIT: u32 = 7;

// Trade actions
pub const TRADE_ACTION_DEAL: u32 = 1;
pub const TRADE_ACTION_REMOVE: u32 = 8;

// Order lifetime
pub const ORDER_TIME_GTC: u32 = 0;

// Fill policies
pub const ORDER_FILLING_FOK: u32 = 0;
pub const ORDER_FILLING_IOC: u32 = 1;
pub const ORDER_FILLING_RETURN: u32 = 2;
pub const ORDER_FILLING_BOC: u32 = 3;

// Return codes
pub const TRADE_RETCODE_REQUOTE: u32 = 10004;
pub const TRADE_RETCODE_REJECT: u32 = 10006;
pub const TRADE_RETCODE_PLACED: u32 = 10008;
pub const TRADE_RETCODE_DONE: u32 = 10009;
pub const TRADE_RETCODE_DONE_PARTIAL: u32 = 10010;
pub const TRADE_RETCODE_INVALID: u32 = 10013;
pub const TRADE_RETCODE_INVALID_VOLUME: u32 = 10014;
pub const TRADE_RETCODE_INVALID_PRICE: u32 = 10015;
pub const TRADE_RETCODE_PRICE_OFF: u32 = 10021;
pub const TRADE_RETCODE_INVALID_FILL: u32 = 10030;
pub const TRADE_RETCODE_INVALID_ORDER: u32 = 10035;
pub const TRADE_RETCODE_POSITION_CLOSED: u32 = 10036;

// Deal entry
pub const DEAL_ENTRY_IN: u32 = 0;
pub const DEAL_ENTRY_OUT: u32 = 1;

pub fn is_success_retcode(retcode: u32) -> bool {
    matches!(
        retcode,
        TRADE_RETCODE_DONE | TRADE_RETCODE_DONE_PARTIAL | TRADE_RETCODE_PLACED
    )
}
