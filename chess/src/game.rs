use cozy_chess::{Board, GameStatus, Move, Piece, Square};

use crate::fen::{FenError, STARTING_FEN};
use crate::result::GameResult;
use crate::types::Side;
use crate::uci::{convert_cozy_castling_to_uci, convert_uci_castling_to_cozy, format_uci_move};

/// Name of the only variant the board factory knows.
pub const STANDARD_VARIANT: &str = "standard";

/// Main game state wrapper around cozy-chess Board
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
    history: Vec<HistoryEntry>,
    start_position: StartPosition,
}

/// A move that has been played, with enough context for records.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub mv: Move,
    pub piece: Piece,
    pub side: Side,
    pub captured: Option<Piece>,
    pub san: String,
    pub fen: String,
}

/// Starting position of the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPosition {
    Standard,
    Fen(String),
}

impl Game {
    /// Create a new game from the standard starting position
    pub fn new() -> Self {
        Self {
            position: Board::default(),
            history: Vec::new(),
            start_position: StartPosition::Standard,
        }
    }

    /// Board factory: create the starting position of a named variant.
    pub fn for_variant(variant: &str) -> Result<Self, GameError> {
        if Self::supports_variant(variant) {
            Ok(Self::new())
        } else {
            Err(GameError::UnsupportedVariant(variant.to_string()))
        }
    }

    pub fn supports_variant(variant: &str) -> bool {
        variant == STANDARD_VARIANT
    }

    /// Create a game from a FEN string
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let position = crate::fen::parse_fen(fen)?;
        Ok(Self {
            position,
            history: Vec::new(),
            start_position: StartPosition::Fen(fen.trim().to_string()),
        })
    }

    /// Get the current board position
    pub fn position(&self) -> &Board {
        &self.position
    }

    /// Get the move history
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn start_position(&self) -> &StartPosition {
        &self.start_position
    }

    pub fn start_fen(&self) -> String {
        match &self.start_position {
            StartPosition::Standard => STARTING_FEN.to_string(),
            StartPosition::Fen(fen) => fen.clone(),
        }
    }

    /// Number of half-moves played since the start position.
    pub fn plies_played(&self) -> u32 {
        self.history.len() as u32
    }

    /// Make a move on the board
    pub fn make_move(&mut self, mv: Move) -> Result<HistoryEntry, GameError> {
        if !self.legal_moves().contains(&mv) {
            return Err(GameError::IllegalMove(format_uci_move(mv)));
        }

        let captured = self.position.piece_on(mv.to);
        let piece = self
            .position
            .piece_on(mv.from)
            .ok_or_else(|| GameError::IllegalMove(format_uci_move(mv)))?;
        let side = Side::from(self.position.side_to_move());

        // Castling is encoded king-takes-rook; the rook square is not a capture.
        let captured = captured.filter(|_| self.position.color_on(mv.to) != Some(side.into()));
        let san = generate_san(mv, piece, captured.is_some());

        self.position.play_unchecked(mv);

        let entry = HistoryEntry {
            mv,
            piece,
            side,
            captured,
            san,
            fen: self.to_fen(),
        };
        self.history.push(entry.clone());

        Ok(entry)
    }

    /// Play a move given in UCI notation.
    pub fn play_uci(&mut self, text: &str) -> Result<HistoryEntry, GameError> {
        let mv = crate::uci::parse_uci_move(text)
            .ok_or_else(|| GameError::IllegalMove(text.to_string()))?;
        let mv = convert_uci_castling_to_cozy(mv, &self.legal_moves());
        self.make_move(mv)
    }

    /// Played moves in UCI notation (castling as king-two-squares).
    pub fn uci_moves(&self) -> Vec<String> {
        self.history
            .iter()
            .map(|e| format_uci_move(convert_cozy_castling_to_uci(e.mv, e.piece == Piece::King)))
            .collect()
    }

    /// Get all legal moves for the current position
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.position.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    /// Get the current game status
    pub fn status(&self) -> GameStatus {
        self.position.status()
    }

    /// Get the side to move
    pub fn side_to_move(&self) -> Side {
        Side::from(self.position.side_to_move())
    }

    /// Result if the board itself ended the game (mate, stalemate, fifty moves).
    pub fn outcome(&self) -> Option<GameResult> {
        match self.status() {
            GameStatus::Won => {
                let winner = self.side_to_move().opposite();
                Some(GameResult::win(
                    winner,
                    format!("{} mates", capitalize(winner.as_str())),
                ))
            }
            GameStatus::Drawn if self.position.halfmove_clock() >= 100 => {
                Some(GameResult::draw("Draw by fifty moves rule"))
            }
            GameStatus::Drawn => Some(GameResult::draw("Draw by stalemate")),
            GameStatus::Ongoing => None,
        }
    }

    /// Known result of the current position, if the ending is settled.
    ///
    /// Only endings that are trivially decided without probing tablebase
    /// files are reported: bare kings and a lone minor piece against a king.
    pub fn tablebase_result(&self) -> Option<GameResult> {
        let occupied = self.position.occupied().len();
        let minors =
            (self.position.pieces(Piece::Knight) | self.position.pieces(Piece::Bishop)).len();

        if occupied == 2 || (occupied == 3 && minors == 1) {
            Some(GameResult::draw("Draw by insufficient mating material"))
        } else {
            None
        }
    }

    /// Export position to FEN string
    pub fn to_fen(&self) -> String {
        crate::fen::format_fen(&self.position)
    }
}

/// Generate simplified SAN notation for a move
fn generate_san(mv: Move, piece: Piece, is_capture: bool) -> String {
    let mut san = String::new();

    match piece {
        Piece::King if mv.from.rank() == mv.to.rank() && file_distance(mv) > 1 => {
            return if (mv.to.file() as usize) > (mv.from.file() as usize) {
                "O-O".to_string()
            } else {
                "O-O-O".to_string()
            };
        }
        Piece::King => san.push('K'),
        Piece::Queen => san.push('Q'),
        Piece::Rook => san.push('R'),
        Piece::Bishop => san.push('B'),
        Piece::Knight => san.push('N'),
        Piece::Pawn => {
            if is_capture || mv.from.file() != mv.to.file() {
                san.push(file_to_char(mv.from));
            }
        }
    }

    if is_capture || (piece == Piece::Pawn && mv.from.file() != mv.to.file()) {
        san.push('x');
    }

    san.push_str(&mv.to.to_string());

    if let Some(promo) = mv.promotion {
        san.push('=');
        san.push(match promo {
            Piece::Queen => 'Q',
            Piece::Rook => 'R',
            Piece::Bishop => 'B',
            Piece::Knight => 'N',
            _ => '?',
        });
    }

    san
}

fn file_distance(mv: Move) -> usize {
    (mv.from.file() as usize).abs_diff(mv.to.file() as usize)
}

fn file_to_char(square: Square) -> char {
    square
        .to_string()
        .chars()
        .next()
        .unwrap_or('?')
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("Unsupported variant: {0}")]
    UnsupportedVariant(String),
    #[error("FEN parse error: {0}")]
    FenError(#[from] FenError),
}
