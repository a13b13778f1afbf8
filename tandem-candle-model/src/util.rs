//! Utilities.
use crate::registry::ParamRegistry;
use anyhow::Result;
use candle_core::{Device, Tensor, WithDType};
use ndarray::ArrayD;
use num_traits::AsPrimitive;
use tandem_core::record::{Record, RecordValue};

/// Copies an ndarray onto the device, optionally prepending a batch
/// dimension of one.
pub fn arrayd_to_tensor<T1, T2>(
    a: &ArrayD<T1>,
    device: &Device,
    add_batch_dim: bool,
) -> Result<Tensor>
where
    T1: AsPrimitive<T2>,
    T2: WithDType,
{
    let v = a.iter().map(|e| e.as_()).collect::<Vec<_>>();
    let t = Tensor::from_vec(v, a.shape(), device)?;

    match add_batch_dim {
        true => Ok(t.unsqueeze(0)?),
        false => Ok(t),
    }
}

/// Reads a tensor back into an ndarray of the same shape.
pub fn tensor_to_arrayd<T>(t: &Tensor) -> Result<ArrayD<T>>
where
    T: WithDType,
{
    let shape = t.dims().to_vec();
    let v: Vec<T> = t.flatten_all()?.to_vec1()?;
    Ok(ArrayD::from_shape_vec(ndarray::IxDyn(&shape), v)?)
}

/// Mean and raw values of every parameter, for summary records. The value
/// arrays are written as histograms by sinks that support them.
pub fn param_stats(params: &ParamRegistry) -> Result<Record> {
    let mut record = Record::empty();

    for (name, var) in params.iter() {
        let mean: f32 = var.as_tensor().mean_all()?.to_vec0()?;
        record.insert(format!("params/{}_mean", name), RecordValue::Scalar(mean));

        let values: Vec<f32> = var.as_tensor().flatten_all()?.to_vec1()?;
        record.insert(format!("params/{}", name), RecordValue::Array1(values));
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::{arrayd_to_tensor, tensor_to_arrayd};
    use candle_core::Device;
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn test_array_round_trip() {
        let a = ArrayD::from_shape_vec(IxDyn(&[2, 3]), (0..6).map(|v| v as f32).collect())
            .unwrap();
        let t = arrayd_to_tensor::<f32, f32>(&a, &Device::Cpu, false).unwrap();
        assert_eq!(t.dims(), &[2, 3]);

        let b: ArrayD<f32> = tensor_to_arrayd(&t).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_batch_dim() {
        let a = ArrayD::from_shape_vec(IxDyn(&[4]), vec![1.0f32; 4]).unwrap();
        let t = arrayd_to_tensor::<f32, f32>(&a, &Device::Cpu, true).unwrap();
        assert_eq!(t.dims(), &[1, 4]);
    }
}
