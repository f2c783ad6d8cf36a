// RPC响应校验模块 - 防止链上数据污染

use anyhow::{Context, Result};

/// 验证 eth_getBalance 返回的十六进制余额
pub fn validate_balance(balance_hex: &str) -> Result<u128> {
    // 必须是 0x 开头的 quantity
    let balance_hex = balance_hex
        .strip_prefix("0x")
        .context("Balance quantity missing 0x prefix")?;

    if balance_hex.is_empty() {
        anyhow::bail!("Empty balance quantity");
    }

    if !balance_hex.chars().all(|c| c.is_ascii_hexdigit()) {
        anyhow::bail!("Balance quantity is not hex: 0x{}", balance_hex);
    }

    // 前导零不计入长度；去掉后超过32个十六进制字符即超出 u128
    let digits = balance_hex.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    if digits.len() > 32 {
        anyhow::bail!("Balance quantity overflows u128: 0x{}", balance_hex);
    }

    let balance = u128::from_str_radix(digits, 16).context("Failed to parse balance from hex")?;

    Ok(balance)
}

/// 验证 Solana getBalance 的 result：`{ context, value: <lamports> }`
pub fn validate_lamports(result: &serde_json::Value) -> Result<u128> {
    let value = result
        .get("value")
        .context("Missing value in getBalance result")?;

    let lamports = value
        .as_u64()
        .with_context(|| format!("Lamport balance is not an unsigned integer: {}", value))?;

    Ok(u128::from(lamports))
}

/// 验证 getLatestBlockhash 的 result，返回 32 字节区块哈希
pub fn validate_blockhash(result: &serde_json::Value) -> Result<[u8; 32]> {
    let blockhash = result
        .get("value")
        .and_then(|v| v.get("blockhash"))
        .and_then(|b| b.as_str())
        .context("Missing value.blockhash in getLatestBlockhash result")?;

    let bytes = bs58::decode(blockhash)
        .into_vec()
        .context("Blockhash is not valid base58")?;

    bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("Blockhash must be 32 bytes, got {}", bytes.len()))
}

/// 验证 Solana 交易签名（64 字节，Base58）
pub fn validate_signature(signature: &str) -> Result<String> {
    let bytes = bs58::decode(signature)
        .into_vec()
        .context("Signature is not valid base58")?;
    if bytes.len() != 64 {
        anyhow::bail!("Invalid signature length: expected 64, got {}", bytes.len());
    }
    Ok(signature.to_string())
}

/// 验证交易哈希格式
pub fn validate_tx_hash(tx_hash: &str) -> Result<String> {
    // 移除0x前缀
    let hash = tx_hash.trim_start_matches("0x");

    // 验证长度（以太坊交易哈希为32字节 = 64个十六进制字符）
    if hash.len() != 64 {
        anyhow::bail!(
            "Invalid transaction hash length: expected 64, got {}",
            hash.len()
        );
    }

    // 验证是否为有效的十六进制字符串
    if !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        anyhow::bail!("Invalid transaction hash format: contains non-hex characters");
    }

    Ok(format!("0x{}", hash.to_lowercase()))
}

/// 验证RPC响应格式
pub fn validate_rpc_response(json: &serde_json::Value) -> Result<()> {
    // 检查是否有error字段
    if let Some(error) = json.get("error") {
        let error_code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
        let error_msg = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error");
        anyhow::bail!("RPC error {}: {}", error_code, error_msg);
    }

    // 检查是否有result字段
    if json.get("result").is_none() {
        anyhow::bail!("Missing result field in RPC response");
    }

    // 检查jsonrpc版本
    if let Some(version) = json.get("jsonrpc") {
        if version.as_str() != Some("2.0") {
            anyhow::bail!("Unsupported JSON-RPC version: {:?}", version);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_balance() {
        assert_eq!(
            validate_balance("0x1bc16d674ec80000").unwrap(),
            2_000_000_000_000_000_000
        ); // 2 ETH
        assert_eq!(validate_balance("0x0").unwrap(), 0);
        assert!(validate_balance("invalid").is_err());
        assert!(validate_balance("1bc16d674ec80000").is_err());
        assert!(validate_balance("0x").is_err());
        assert!(validate_balance("0xzz").is_err());
    }

    #[test]
    fn test_validate_balance_full_u128_range() {
        // 补零的 quantity 照常解析
        assert_eq!(
            validate_balance(&format!("0x{}1bc16d674ec80000", "0".repeat(40))).unwrap(),
            2_000_000_000_000_000_000
        );
        assert_eq!(validate_balance("0x0000").unwrap(), 0);
        assert_eq!(
            validate_balance(&format!("0x{}", "f".repeat(32))).unwrap(),
            u128::MAX
        );
        // 10^31 wei
        assert_eq!(
            validate_balance("0x7e37be2022c0914b2680000000").unwrap(),
            10_000_000_000_000_000_000_000_000_000_000
        );
        assert!(validate_balance(&format!("0x1{}", "0".repeat(32))).is_err());
    }

    #[test]
    fn test_validate_lamports() {
        let result = json!({ "context": { "slot": 1 }, "value": 1_500_000_000u64 });
        assert_eq!(validate_lamports(&result).unwrap(), 1_500_000_000);
        assert!(validate_lamports(&json!({ "value": -1 })).is_err());
        assert!(validate_lamports(&json!({ "value": "5" })).is_err());
        assert!(validate_lamports(&json!({})).is_err());
    }

    #[test]
    fn test_validate_blockhash() {
        let hash = bs58::encode([3u8; 32]).into_string();
        let result = json!({ "value": { "blockhash": hash, "lastValidBlockHeight": 10 } });
        assert_eq!(validate_blockhash(&result).unwrap(), [3u8; 32]);

        let short = bs58::encode([3u8; 31]).into_string();
        assert!(validate_blockhash(&json!({ "value": { "blockhash": short } })).is_err());
        assert!(validate_blockhash(&json!({ "value": {} })).is_err());
    }

    #[test]
    fn test_validate_signature() {
        let sig = bs58::encode([1u8; 64]).into_string();
        assert!(validate_signature(&sig).is_ok());
        assert!(validate_signature(&bs58::encode([1u8; 32]).into_string()).is_err());
        assert!(validate_signature("0OIl").is_err());
    }

    #[test]
    fn test_validate_tx_hash() {
        let hash = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";
        assert_eq!(validate_tx_hash(hash).unwrap(), hash);
        assert!(validate_tx_hash("invalid").is_err());
    }

    #[test]
    fn test_validate_rpc_response() {
        assert!(validate_rpc_response(&json!({ "jsonrpc": "2.0", "id": 1, "result": "0x0" })).is_ok());
        let err = validate_rpc_response(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "invalid params" }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("-32602"));
        assert!(validate_rpc_response(&json!({ "jsonrpc": "2.0", "id": 1 })).is_err());
        assert!(validate_rpc_response(&json!({ "jsonrpc": "1.0", "result": 1 })).is_err());
    }
}
