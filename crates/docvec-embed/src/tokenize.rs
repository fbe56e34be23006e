use anyhow::{Result, anyhow, ensure};
use candle_core::{Device, Tensor};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// XLM-RoBERTa pads with token id 1.
pub const PAD_TOKEN_ID: u32 = 1;

/// Make every encoding exactly `max_len` tokens: longer input is truncated,
/// shorter input is right-padded.
pub fn configure_fixed_length(tokenizer: &mut Tokenizer, max_len: usize) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
        .map_err(|e| anyhow!("Invalid truncation settings: {}", e))?;
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::Fixed(max_len),
        pad_id: PAD_TOKEN_ID,
        pad_token: "<pad>".to_string(),
        ..Default::default()
    }));
    Ok(())
}

/// Encode `text` into `[1, max_len]` id and attention-mask tensors.
pub fn encode_on_device(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    ensure!(
        enc.get_ids().len() == max_len,
        "tokenizer produced {} tokens, expected {max_len}; call configure_fixed_length first",
        enc.get_ids().len()
    );
    let input_ids = Tensor::new(enc.get_ids(), device)?.unsqueeze(0)?;
    let attention_mask = Tensor::new(enc.get_attention_mask(), device)?.unsqueeze(0)?;
    Ok((input_ids, attention_mask))
}
