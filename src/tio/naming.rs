//! Container naming shared by tiobench and the tio server
//!
//! The feeder stress test writes each symbol's order book under
//! `intelimarket/bvmf/<symbol>/`. These names are an external contract and
//! must match the driver byte for byte.

use std::fmt;

/// Namespace the UMDF feeders write under
pub const SYMBOL_PREFIX: &str = "intelimarket/bvmf/";

/// Well-known child containers of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolContainer {
    BookBuy,
    BookSell,
    Trades,
    Properties,
}

impl SymbolContainer {
    /// Every child container, in the order they are opened
    pub const ALL: [SymbolContainer; 4] = [
        SymbolContainer::BookBuy,
        SymbolContainer::BookSell,
        SymbolContainer::Trades,
        SymbolContainer::Properties,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SymbolContainer::BookBuy => "book_buy",
            SymbolContainer::BookSell => "book_sell",
            SymbolContainer::Trades => "trades",
            SymbolContainer::Properties => "properties",
        }
    }

    /// Whether feeder operations land in this container
    pub fn counts_operations(self) -> bool {
        matches!(self, SymbolContainer::BookBuy | SymbolContainer::BookSell)
    }

    /// Full container path for `symbol`
    pub fn path(self, symbol: &str) -> String {
        format!("{}{}/{}", SYMBOL_PREFIX, symbol, self.as_str())
    }
}

impl fmt::Display for SymbolContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
