//! 助记词与种子
//!
//! BIP-39 英文助记词。种子是助记词的纯确定性函数（PBKDF2-HMAC-SHA512，空口令），
//! 同一组单词无论派生多少次都得到相同的 64 字节。

use std::fmt;

use bip39::{Language, Mnemonic};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{WalletError, WalletResult};

/// 生成时使用的单词数（128 位熵）
pub const GENERATED_WORD_COUNT: usize = 12;

/// 支持导入的单词数
pub const SUPPORTED_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretMaterial {
    words: Vec<String>,
    seed: [u8; 64],
}

impl SecretMaterial {
    /// 用新的系统熵生成 12 个单词的助记词
    pub fn generate() -> Self {
        let mut entropy = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut entropy);

        // 16 字节熵总是合法长度
        let mnemonic = match Mnemonic::from_entropy_in(Language::English, &entropy) {
            Ok(mnemonic) => mnemonic,
            Err(e) => unreachable!("128-bit entropy rejected by bip39: {}", e),
        };
        entropy.zeroize();

        Self::from_mnemonic(&mnemonic)
    }

    /// 导入用户提供的助记词
    ///
    /// 合并多余空白、统一小写后校验单词数和校验和
    pub fn import(phrase: &str) -> WalletResult<Self> {
        let normalized = phrase
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>();

        if !SUPPORTED_WORD_COUNTS.contains(&normalized.len()) {
            return Err(WalletError::InvalidSecret(format!(
                "unsupported word count {} (expected one of {:?})",
                normalized.len(),
                SUPPORTED_WORD_COUNTS
            )));
        }

        let mut joined = normalized.join(" ");
        let parsed = Mnemonic::parse_in(Language::English, &joined);
        joined.zeroize();

        Ok(Self::from_mnemonic(&parsed?))
    }

    fn from_mnemonic(mnemonic: &Mnemonic) -> Self {
        let mut phrase = mnemonic.to_string();
        let words = phrase.split(' ').map(str::to_string).collect();
        phrase.zeroize();

        Self {
            words,
            seed: mnemonic.to_seed(""),
        }
    }

    /// 派生种子（确定性，无副作用）
    pub fn derive_seed(&self) -> [u8; 64] {
        self.seed
    }

    pub fn seed(&self) -> &[u8; 64] {
        &self.seed
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// 完整助记词（以单个空格分隔）
    pub fn phrase(&self) -> String {
        self.words.join(" ")
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretMaterial")
            .field("word_count", &self.words.len())
            .finish_non_exhaustive()
    }
}

impl PartialEq for SecretMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.words == other.words
    }
}

impl Eq for SecretMaterial {}
