use opcua::types::{DataValue, Variant};

/// Widens any numeric (or boolean) variant to `f64`.
pub fn variant_to_f64(variant: &Variant) -> Option<f64> {
    let value = match variant {
        Variant::Boolean(value) => {
            if *value {
                1.0
            } else {
                0.0
            }
        }
        Variant::SByte(value) => *value as f64,
        Variant::Byte(value) => *value as f64,
        Variant::Int16(value) => *value as f64,
        Variant::UInt16(value) => *value as f64,
        Variant::Int32(value) => *value as f64,
        Variant::UInt32(value) => *value as f64,
        Variant::Int64(value) => *value as f64,
        Variant::UInt64(value) => *value as f64,
        Variant::Float(value) => *value as f64,
        Variant::Double(value) => *value,
        _ => return None,
    };

    Some(value)
}

/// Extracts the scalar out of a read result, rejecting bad statuses and
/// non numeric payloads.
pub fn data_value_to_f64(data_value: &DataValue) -> Result<f64, String> {
    if let Some(status) = data_value.status {
        if !status.is_good() {
            return Err(format!("node answered with status {:?}", status));
        }
    }

    let variant = data_value
        .value
        .as_ref()
        .ok_or_else(|| "node returned no value".to_string())?;

    variant_to_f64(variant).ok_or_else(|| format!("node value {:?} is not a scalar number", variant))
}

/// Checks that the value read back after a write is the one written.
pub fn verify_echo(written: f64, echoed: &DataValue) -> Result<(), String> {
    let echoed = data_value_to_f64(echoed)?;

    if echoed != written {
        return Err(format!(
            "verification failed, wrote {} but read back {}",
            written, echoed
        ));
    }

    Ok(())
}
