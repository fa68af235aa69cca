/// helper functions for rendering
use crate::data::*;
use itertools::*;

pub fn rendervec(fs: &[String]) -> String {
    format!("[{}]", fs.join(", "))
}

pub fn rendervalues(vs: &[Value]) -> String {
    rendervec(&vs.iter().map(|v| format!("{}", v)).collect_vec())
}

pub fn renderfloats(fs: &[f64], high_prec: bool) -> String {
    rendervec(&fs.iter().map(|x| fmt_f64(high_prec)(*x)).collect_vec())
}

pub fn fmt_f64(high_precision: bool) -> impl Fn(f64) -> String {
    if high_precision {
        move |x: f64| format!("{}", x)
    } else {
        move |x: f64| format!("{:.2}", x)
    }
}

pub fn renderenv(env: &Env) -> String {
    env.iter().map(|(k, v)| format!("{k}: {v}")).join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderfloats() {
        assert_eq!(renderfloats(&[0.5, 1.0 / 3.0], false), "[0.50, 0.33]");
        assert_eq!(renderfloats(&[0.5], true), "[0.5]");
        assert_eq!(renderfloats(&[], true), "[]");
    }
}
