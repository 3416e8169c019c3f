//! Numeric reply codes the client engine reacts to.
//!
//! Numerics are kept as the three-digit strings they arrive as, so they can
//! be compared directly against [`Event::command`](crate::Event::command).

/// `001` - registration confirmed; first argument is our nickname.
pub const RPL_WELCOME: &str = "001";
/// `332` - channel topic: `<me> <channel> :<topic>`.
pub const RPL_TOPIC: &str = "332";
/// `353` - bulk member list: `<me> <type> <channel> :<nicks>`.
pub const RPL_NAMREPLY: &str = "353";
/// `366` - end of member list: `<me> <channel> :End of /NAMES list`.
pub const RPL_ENDOFNAMES: &str = "366";
/// `421` - unknown command: `<me> <command> :Unknown command`.
pub const ERR_UNKNOWNCOMMAND: &str = "421";
/// `433` - nickname in use: `<me> <nick> :Nickname is already in use`.
pub const ERR_NICKNAMEINUSE: &str = "433";

/// Whether a command token is a three-digit numeric reply.
pub fn is_numeric(command: &str) -> bool {
    command.len() == 3 && command.bytes().all(|b| b.is_ascii_digit())
}
