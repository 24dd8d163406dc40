pub mod fen;
pub mod game;
pub mod result;
pub mod types;
pub mod uci;

pub use fen::{FenError, STARTING_FEN};
pub use game::{Game, GameError, HistoryEntry, StartPosition, STANDARD_VARIANT};
pub use result::{GameResult, ResultKind};
pub use types::Side;
pub use uci::{
    convert_cozy_castling_to_uci, convert_uci_castling_to_cozy, format_uci_move, parse_uci_move,
};
