//! Closed set of supported coins and the immutable lookup table describing them.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::CandelaError;

macro_rules! coins {
    ($( $(#[$meta:meta])* $variant:ident => ($id:literal, $ticker:literal) ),+ $(,)?) => {
        /// Coins known to the engine.
        ///
        /// Serialized by their slug id (e.g. `"bitcoin"`).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum Coin {
            $( $(#[$meta])* #[doc = $id] $variant, )+
        }

        impl Coin {
            /// Every known coin in declaration order.
            pub const ALL: &'static [Self] = &[$( Self::$variant ),+];

            /// Slug identifier, e.g. `"bitcoin"`.
            #[must_use]
            pub const fn id(self) -> &'static str {
                match self { $( Self::$variant => $id ),+ }
            }

            /// Exchange ticker, e.g. `"BTC"`.
            #[must_use]
            pub const fn ticker(self) -> &'static str {
                match self { $( Self::$variant => $ticker ),+ }
            }
        }
    };
}

coins! {
    Bitcoin => ("bitcoin", "BTC"),
    Ethereum => ("ethereum", "ETH"),
    Solana => ("solana", "SOL"),
    Xrp => ("xrp", "XRP"),
    Ada => ("ada", "ADA"),
    Avalanche => ("avalanche", "AVAX"),
    Dogecoin => ("dogecoin", "DOGE"),
    Polkadot => ("polkadot", "DOT"),
    Polygon => ("polygon", "MATIC"),
    Chainlink => ("chainlink", "LINK"),
    Near => ("near", "NEAR"),
    InternetComputer => ("internet-computer", "ICP"),
    Cosmos => ("cosmos", "ATOM"),
    Aptos => ("aptos", "APT"),
    Arbitrum => ("arbitrum", "ARB"),
    Optimism => ("optimism", "OP"),
    Sui => ("sui", "SUI"),
    Uniswap => ("uniswap", "UNI"),
    Aave => ("aave", "AAVE"),
    Curve => ("curve", "CRV"),
    Maker => ("maker", "MKR"),
    Compound => ("compound", "COMP"),
    Synthetix => ("synthetix", "SNX"),
    Lido => ("lido", "LDO"),
    Sushiswap => ("sushiswap", "SUSHI"),
    YearnFinance => ("yearn-finance", "YFI"),
    Balancer => ("balancer", "BAL"),
    PerpetualProtocol => ("perpetual-protocol", "PERP"),
    Sandbox => ("sandbox", "SAND"),
    Decentraland => ("decentraland", "MANA"),
    AxieInfinity => ("axie-infinity", "AXS"),
    ImmutableX => ("immutablex", "IMX"),
    EthereumNameService => ("ethereum-name-service", "ENS"),
    Blur => ("blur", "BLUR"),
    ApeCoin => ("apecoin", "APE"),
    Filecoin => ("filecoin", "FIL"),
    TheGraph => ("the-graph", "GRT"),
    Loopring => ("loopring", "LRC"),
    Ankr => ("ankr", "ANKR"),
    Skale => ("skale", "SKL"),
    MaskNetwork => ("mask-network", "MASK"),
    Litecoin => ("litecoin", "LTC"),
    BitcoinCash => ("bitcoin-cash", "BCH"),
    EthereumClassic => ("ethereum-classic", "ETC"),
    Zcash => ("zcash", "ZEC"),
    Stellar => ("stellar", "XLM"),
    VeChain => ("vechain", "VET"),
    Hedera => ("hedera", "HBAR"),
    Quant => ("quant", "QNT"),
    Algorand => ("algorand", "ALGO"),
    Eos => ("eos", "EOS"),
    Tezos => ("tezos", "XTZ"),
    Chiliz => ("chiliz", "CHZ"),
    BasicAttentionToken => ("basic-attention-token", "BAT"),
    OneInch => ("1inch", "1INCH"),
    ShibaInu => ("shiba-inu", "SHIB"),
    Dogwifhat => ("dogwifhat", "WIF"),
}

impl Coin {
    /// Look up a coin by slug id or ticker (case-insensitive for tickers).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.id() == s || c.ticker().eq_ignore_ascii_case(s))
    }

    /// The USD trading pair used when the registry has no explicit product id.
    #[must_use]
    pub fn default_product_id(self) -> String {
        format!("{}-USD", self.ticker())
    }
}

impl TryFrom<String> for Coin {
    type Error = CandelaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s).ok_or_else(|| CandelaError::InvalidArg(format!("unknown coin: {s}")))
    }
}

impl From<Coin> for String {
    fn from(c: Coin) -> Self {
        c.id().to_string()
    }
}

impl core::fmt::Display for Coin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.id())
    }
}

/// Static description of one coin: its trading pair and optional listing date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinInfo {
    /// Which coin this entry describes.
    pub id: Coin,
    /// Exchange product id, e.g. `"BTC-USD"`.
    pub symbol: String,
    /// Known first trading day; used as a hint to skip the earliest-date search.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Free-form grouping label.
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Deserialize)]
struct CoinsDocument {
    coins: Vec<CoinInfo>,
}

/// Immutable coin lookup table, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct CoinRegistry {
    entries: HashMap<Coin, CoinInfo>,
}

impl CoinRegistry {
    /// Build from explicit entries. Later duplicates replace earlier ones.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = CoinInfo>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.id, e)).collect(),
        }
    }

    /// Parse a `{"coins": [...]}` document.
    ///
    /// # Errors
    /// Returns `CandelaError::Data` if the document is malformed or names an unknown coin.
    pub fn from_json(doc: &str) -> Result<Self, CandelaError> {
        let parsed: CoinsDocument = serde_json::from_str(doc)?;
        Ok(Self::new(parsed.coins))
    }

    /// Look up a coin's entry.
    #[must_use]
    pub fn get(&self, coin: Coin) -> Option<&CoinInfo> {
        self.entries.get(&coin)
    }

    /// Product id for a coin, falling back to its USD pair.
    #[must_use]
    pub fn product_id(&self, coin: Coin) -> String {
        self.get(coin)
            .map_or_else(|| coin.default_product_id(), |e| e.symbol.clone())
    }

    /// Iterate entries in `Coin` declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CoinInfo> {
        Coin::ALL.iter().filter_map(|c| self.entries.get(c))
    }

    /// Number of configured coins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no coins are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
