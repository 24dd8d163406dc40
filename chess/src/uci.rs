//! UCI (Universal Chess Interface) move notation helpers

use cozy_chess::{File, Move, Piece, Rank, Square};

/// Convert UCI castling notation to cozy_chess notation
///
/// UCI uses standard notation (king moves 2 squares): e1g1, e1c1, e8g8, e8c8
/// cozy_chess uses king-to-rook notation: e1h1, e1a1, e8h8, e8a8
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    let is_back_rank = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);
    let is_g_or_c_file = matches!(mv.to.file(), File::G | File::C);

    if !(is_back_rank && is_e_file && is_g_or_c_file && mv.promotion.is_none()) {
        return mv;
    }

    let rook_file = if mv.to.file() == File::G {
        File::H
    } else {
        File::A
    };
    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };

    if legal_moves.contains(&converted) {
        converted
    } else {
        mv
    }
}

/// Convert cozy_chess king-takes-rook castling back to UCI notation.
pub fn convert_cozy_castling_to_uci(mv: Move, king_moved: bool) -> Move {
    if !king_moved || mv.from.rank() != mv.to.rank() {
        return mv;
    }
    let to_file = match (mv.from.file(), mv.to.file()) {
        (File::E, File::H) => File::G,
        (File::E, File::A) => File::C,
        _ => return mv,
    };
    Move {
        from: mv.from,
        to: Square::new(to_file, mv.to.rank()),
        promotion: None,
    }
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", mv.from, mv.to);
    if let Some(promo) = mv.promotion {
        s.push(promotion_char(promo));
    }
    s
}

/// Parse a move in UCI notation. Castling is still in king-two-squares form;
/// run it through [`convert_uci_castling_to_cozy`] before playing it.
pub fn parse_uci_move(text: &str) -> Option<Move> {
    text.trim().parse().ok()
}

fn promotion_char(piece: Piece) -> char {
    match piece {
        Piece::Queen => 'q',
        Piece::Rook => 'r',
        Piece::Bishop => 'b',
        Piece::Knight => 'n',
        Piece::Pawn => 'p',
        Piece::King => 'k',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uci_move() {
        let mv = Move {
            from: Square::new(File::E, Rank::Second),
            to: Square::new(File::E, Rank::Fourth),
            promotion: None,
        };
        assert_eq!(format_uci_move(mv), "e2e4");
    }

    #[test]
    fn test_format_uci_move_with_promotion() {
        let mv = Move {
            from: Square::new(File::E, Rank::Seventh),
            to: Square::new(File::E, Rank::Eighth),
            promotion: Some(Piece::Queen),
        };
        assert_eq!(format_uci_move(mv), "e7e8q");
    }

    #[test]
    fn test_parse_uci_move() {
        let mv = parse_uci_move("g1f3").unwrap();
        assert_eq!(mv.from, Square::new(File::G, Rank::First));
        assert_eq!(mv.to, Square::new(File::F, Rank::Third));
        assert!(parse_uci_move("z9").is_none());
    }

    #[test]
    fn test_castling_roundtrip() {
        let uci = parse_uci_move("e1g1").unwrap();
        let cozy = Move {
            from: Square::new(File::E, Rank::First),
            to: Square::new(File::H, Rank::First),
            promotion: None,
        };
        assert_eq!(convert_uci_castling_to_cozy(uci, &[cozy]), cozy);
        assert_eq!(convert_cozy_castling_to_uci(cozy, true), uci);
        assert_eq!(convert_cozy_castling_to_uci(cozy, false), cozy);
    }
}
