use anyhow::{Result, ensure};
use candle_core::{DType, Tensor};

/// Mean-pool `[B,T,H]` hidden states over the tokens selected by a `[B,T]`
/// attention mask, then L2-normalise each row. Returns `[B,H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, seq, _) = hidden.dims3()?;
    ensure!(
        attention_mask.dims() == [batch, seq],
        "mask shape {:?} does not match hidden states [{batch}, {seq}, _]",
        attention_mask.dims()
    );

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let summed = hidden.broadcast_mul(&mask.unsqueeze(2)?)?.sum(1)?;
    // A row with no live tokens pools to zeros instead of NaN.
    let counts = mask.sum_keepdim(1)?.maximum(1.0)?;
    let mean = summed.broadcast_div(&counts)?;

    let eps = if hidden.dtype() == DType::F16 { 1e-6 } else { 1e-12 };
    let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.maximum(eps)?;
    Ok(mean.broadcast_div(&norm)?)
}
