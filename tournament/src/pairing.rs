//! Round-robin pairings generated with the Berger table (circle) method.
//!
//! The table holds `count` slots, where `count` is the player count rounded
//! up to an even number. Index `player_count` is the bye when the roster is
//! odd. Every round reads the table pairwise, then all entries except the
//! anchor (`count - 1`) advance by `count / 2` modulo `count - 1` and the
//! anchor moves between the first and second slot so that it alternates
//! colors from round to round.
//!
//! The scheduler state depends only on the player count and on how many
//! pairs have been drawn, so replaying `next_pair` from a fresh scheduler
//! reconstructs it exactly.

use crate::error::{TournamentError, TournamentResult};

/// One scheduled game: indexes into the tournament roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pairing {
    pub white: usize,
    pub black: usize,
    pub round: u32,
}

/// A pair read off the table, before byes are filtered out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableEntry {
    Game(Pairing),
    Bye { player: usize, round: u32 },
}

#[derive(Debug, Clone)]
pub struct PairingScheduler {
    player_count: usize,
    table: Vec<usize>,
    pair_number: usize,
    round: u32,
    games_paired: u64,
}

impl PairingScheduler {
    pub fn new(player_count: usize) -> TournamentResult<Self> {
        if player_count < 2 {
            return Err(TournamentError::NotEnoughPlayers(player_count));
        }
        let mut scheduler = Self {
            player_count,
            table: Vec::new(),
            pair_number: 0,
            round: 1,
            games_paired: 0,
        };
        scheduler.initialize();
        Ok(scheduler)
    }

    /// Reset to the first pair of round 1.
    pub fn initialize(&mut self) {
        let count = self.table_size();
        let mut table = vec![0; count];
        for i in 0..count / 2 {
            table[2 * i] = i;
        }
        for i in count / 2..count {
            table[2 * (count - i) - 1] = i;
        }
        self.table = table;
        self.pair_number = 0;
        self.round = 1;
        self.games_paired = 0;
    }

    pub fn player_count(&self) -> usize {
        self.player_count
    }

    /// Distinct games in one full cycle: `n * (n - 1) / 2`.
    pub fn games_per_cycle(&self) -> u64 {
        let n = self.player_count as u64;
        n * (n - 1) / 2
    }

    /// Table rounds in one full cycle, bye rounds included.
    pub fn rounds_per_cycle(&self) -> u32 {
        (self.table_size() - 1) as u32
    }

    /// Round of the most recently drawn pair (1 before the first draw).
    pub fn current_round(&self) -> u32 {
        self.round
    }

    /// Real games handed out since the last `initialize`.
    pub fn games_paired(&self) -> u64 {
        self.games_paired
    }

    /// Next real game. Pairs involving the bye are skipped transparently.
    pub fn next_pair(&mut self) -> Pairing {
        loop {
            if let TableEntry::Game(pairing) = self.next_entry() {
                return pairing;
            }
        }
    }

    fn table_size(&self) -> usize {
        self.player_count + self.player_count % 2
    }

    fn next_entry(&mut self) -> TableEntry {
        let count = self.table_size();
        if self.pair_number >= count / 2 {
            self.pair_number = 0;
            self.round += 1;
            self.rotate();
        }

        let mut white = self.table[2 * self.pair_number];
        let mut black = self.table[2 * self.pair_number + 1];
        self.pair_number += 1;

        if white >= self.player_count {
            return TableEntry::Bye {
                player: black,
                round: self.round,
            };
        }
        if black >= self.player_count {
            return TableEntry::Bye {
                player: white,
                round: self.round,
            };
        }

        // Every other cycle is played with reversed colors
        if (self.games_paired / self.games_per_cycle()) % 2 == 1 {
            std::mem::swap(&mut white, &mut black);
        }
        self.games_paired += 1;

        TableEntry::Game(Pairing {
            white,
            black,
            round: self.round,
        })
    }

    fn rotate(&mut self) {
        let count = self.table_size();
        let anchor = count - 1;
        for entry in self.table.iter_mut() {
            if *entry != anchor {
                *entry = (*entry + count / 2) % anchor;
            }
        }

        self.table.retain(|&entry| entry != anchor);
        let round_in_cycle = (self.round - 1) % self.rounds_per_cycle() + 1;
        let slot = if round_in_cycle % 2 == 0 { 0 } else { 1 };
        self.table.insert(slot, anchor);
    }
}
