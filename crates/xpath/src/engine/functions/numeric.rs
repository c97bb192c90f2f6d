use super::{node_set_arg, string_or_context};
use crate::engine::runtime::{CallCtx, Error};
use crate::model::Navigator;
use crate::xdm::{Value, string_to_number};

/// `round()`: nearest integer, halves towards positive infinity. NaN,
/// infinities and zeros are returned unchanged; `[-0.5, 0)` rounds to -0.
pub(crate) fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        n
    } else if (-0.5..0.0).contains(&n) {
        -0.0
    } else if n.abs() >= 4_503_599_627_370_496.0 {
        // 2^52: already integral
        n
    } else {
        let f = n.floor();
        if n - f >= 0.5 { f + 1.0 } else { f }
    }
}

pub(super) fn number_fn<N: Navigator>(ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let n = match args.first() {
        Some(v) => v.to_number()?,
        None => string_to_number(&string_or_context(ctx, args, 0)?),
    };
    Ok(Value::Number(n))
}

pub(super) fn sum_fn<N: Navigator>(_ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    let mut total = 0.0;
    for n in node_set_arg(args, 0, "sum")? {
        total += string_to_number(&n?.string_value());
    }
    Ok(Value::Number(total))
}

pub(super) fn floor_fn<N: Navigator>(_ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    Ok(Value::Number(args[0].to_number()?.floor()))
}

pub(super) fn ceiling_fn<N: Navigator>(_ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    Ok(Value::Number(args[0].to_number()?.ceil()))
}

pub(super) fn round_fn<N: Navigator>(_ctx: &CallCtx<N>, args: &[Value<N>]) -> Result<Value<N>, Error> {
    Ok(Value::Number(xpath_round(args[0].to_number()?)))
}

#[cfg(test)]
mod tests {
    use super::xpath_round;

    #[test]
    fn rounds_halves_up() {
        assert_eq!(xpath_round(2.5), 3.0);
        assert_eq!(xpath_round(-2.5), -2.0);
        assert_eq!(xpath_round(-0.2).to_bits(), (-0.0f64).to_bits());
        assert!(xpath_round(f64::NAN).is_nan());
        assert_eq!(xpath_round(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn rounds_near_half_and_past_fraction_precision() {
        assert_eq!(xpath_round(0.499_999_999_999_999_94), 0.0);
        assert_eq!(xpath_round(-0.500_000_000_000_000_1), -1.0);
        let odd = 4_503_599_627_370_497.0;
        assert_eq!(xpath_round(odd), odd);
        assert_eq!(xpath_round(-odd), -odd);
        assert_eq!(xpath_round(2_251_799_813_685_248.5), 2_251_799_813_685_249.0);
    }
}
