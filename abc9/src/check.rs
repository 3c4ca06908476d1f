use std::collections::BTreeMap;

use tracing::debug;

use boxsplice_netlist::{Design, Timing, Wire};

use crate::catalog::BoxCatalog;
use crate::error::{CheckError, Error};

/// Values of a timing annotation on `wire`, one per bit. A list of neither one nor `wire.width`
/// values is an error; an empty list yields no values.
pub(crate) fn timing_per_bit(
    module_name: &str,
    wire: &Wire,
    attr: &'static str,
    timing: &Timing,
) -> Result<Vec<i64>, CheckError> {
    let values = timing.per_bit(wire.width).map_err(|error| CheckError::Timing {
        module: module_name.to_owned(),
        port: wire.name.clone(),
        attr,
        error,
    })?;
    if !values.is_empty() && values.len() != wire.width {
        return Err(CheckError::TimingWidth {
            module: module_name.to_owned(),
            port: wire.name.clone(),
            attr,
            width: wire.width,
            value: timing.clone(),
            count: values.len(),
        });
    }
    Ok(values)
}

/// Validates box ids, carry ports, timing annotations, and register macros of every module
/// (other than derived copies) and reports every violation found.
pub fn check(design: &Design) -> Result<(), Error> {
    let mut errors = vec![];
    let mut box_ids: BTreeMap<i64, &str> = BTreeMap::new();
    for module in design.modules() {
        if module.name.starts_with("$paramod") {
            continue;
        }
        debug!("checking module {}", module.name);

        if !module.attrs.flop {
            if let Some(id) = module.attrs.box_id {
                if let Some(other) = box_ids.insert(id, &module.name) {
                    errors.push(CheckError::DuplicateBoxId { module: module.name.clone(), id, other: other.to_owned() });
                    box_ids.insert(id, other);
                }
            }
        }

        if let Err(error) = BoxCatalog::port_order(module) {
            errors.push(error);
        }
        for &port in &module.ports {
            let wire = module.wire(port);
            for (attr, timing) in [("arrival", &wire.attrs.arrival), ("required", &wire.attrs.required)] {
                let Some(timing) = timing else { continue };
                if let Err(error) = timing_per_bit(&module.name, wire, attr, timing) {
                    errors.push(error);
                }
            }
        }

        if module.attrs.flop {
            let count = module.ports.iter().filter(|&&port| module.wire(port).port_output).count();
            if count != 1 {
                errors.push(CheckError::FlopOutputs { module: module.name.clone(), count });
            }
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(Error::Check(errors)) }
}

#[cfg(test)]
mod test {
    use boxsplice_netlist::{Timing, TimingError, Wire};

    use super::timing_per_bit;
    use crate::error::CheckError;

    #[test]
    fn test_timing_per_bit() {
        let wire = Wire::new("\\a", 3);
        let per_bit = |timing: Timing| timing_per_bit("\\m", &wire, "required", &timing);
        assert_eq!(per_bit(Timing::Int(4)), Ok(vec![4, 4, 4]));
        assert_eq!(per_bit(Timing::List("7".into())), Ok(vec![7, 7, 7]));
        assert_eq!(per_bit(Timing::List("1 2 3".into())), Ok(vec![1, 2, 3]));
        assert_eq!(per_bit(Timing::List(String::new())), Ok(vec![]));
        assert!(matches!(
            per_bit(Timing::List("1 2".into())),
            Err(CheckError::TimingWidth { width: 3, count: 2, attr: "required", .. })
        ));
        assert_eq!(
            per_bit(Timing::Int(-1)),
            Err(CheckError::Timing {
                module: "\\m".into(),
                port: "\\a".into(),
                attr: "required",
                error: TimingError::Negative("-1".into())
            })
        );
    }
}
