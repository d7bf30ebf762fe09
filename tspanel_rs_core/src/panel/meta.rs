use super::{Panel, Partition, StaticCovariates};
use crate::{
    error::{bail, Result},
    series::{Dtype, Frequency, RegularSeries},
};

impl Panel {
    pub fn target(&self) -> Option<&RegularSeries> {
        self.target.as_ref()
    }

    pub fn observed(&self) -> Option<&RegularSeries> {
        self.observed.as_ref()
    }

    pub fn known(&self) -> Option<&RegularSeries> {
        self.known.as_ref()
    }

    pub fn static_covariates(&self) -> Option<&StaticCovariates> {
        self.static_covariates.as_ref()
    }

    pub fn freq(&self) -> Frequency {
        self.freq
    }

    pub fn partition(&self, partition: Partition) -> Option<&RegularSeries> {
        self.slot(partition)
    }

    /// every column with its partition, in routing priority order
    pub fn columns(&self) -> Vec<(String, Partition)> {
        let mut columns: Vec<(String, Partition)> = Partition::TIME_VARYING
            .iter()
            .filter_map(|&p| self.slot(p).map(|s| (s, p)))
            .flat_map(|(s, p)| s.columns().iter().map(move |c| (c.clone(), p)))
            .collect();
        if let Some(statics) = &self.static_covariates {
            columns.extend(statics.keys().map(|k| (k.clone(), Partition::Static)));
        }
        columns
    }

    pub fn dtypes(&self) -> Vec<(String, Dtype)> {
        let mut dtypes: Vec<(String, Dtype)> = Partition::TIME_VARYING
            .iter()
            .filter_map(|&p| self.slot(p))
            .flat_map(RegularSeries::dtypes)
            .collect();
        if let Some(statics) = &self.static_covariates {
            dtypes.extend(statics.iter().map(|(k, v)| (k.clone(), v.dtype())));
        }
        dtypes
    }

    /// the partition holding `column`, searched target -> observed -> known -> static
    pub fn locate(&self, column: &str) -> Result<Partition> {
        for partition in Partition::TIME_VARYING {
            if self.slot(partition).is_some_and(|s| s.contains(column)) {
                return Ok(partition);
            }
        }
        if self
            .static_covariates
            .as_ref()
            .is_some_and(|m| m.contains_key(column))
        {
            return Ok(Partition::Static);
        }
        bail!(Value, "column `{column}` does not exist")
    }

    pub fn set_target(&mut self, target: Option<RegularSeries>) -> Result<()> {
        self.commit_series(Partition::Target, target)
    }

    pub fn set_observed(&mut self, observed: Option<RegularSeries>) -> Result<()> {
        self.commit_series(Partition::Observed, observed)
    }

    pub fn set_known(&mut self, known: Option<RegularSeries>) -> Result<()> {
        self.commit_series(Partition::Known, known)
    }

    /// Replace the static covariates, or merge `statics` into them when `append` is set.
    pub fn set_static(&mut self, statics: StaticCovariates, append: bool) -> Result<()> {
        let candidate = match (&self.static_covariates, append) {
            (Some(current), true) => {
                let mut merged = current.clone();
                merged.extend(statics);
                merged
            }
            _ => statics,
        };
        self.commit_static(Some(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        panel::tests::get_test_panel,
        series::{tests::daily_series, Scalar},
    };

    #[test]
    fn test_locate_and_columns() {
        let panel = get_test_panel();
        assert_eq!(panel.locate("sales").unwrap(), Partition::Target);
        assert_eq!(panel.locate("temp").unwrap(), Partition::Observed);
        assert_eq!(panel.locate("holiday").unwrap(), Partition::Known);
        assert_eq!(panel.locate("region").unwrap(), Partition::Static);
        assert!(panel.locate("price").unwrap_err().is_value());
        let names: Vec<String> = panel.columns().into_iter().map(|(c, _)| c).collect();
        assert_eq!(names, vec!["sales", "temp", "holiday", "region"]);
        assert_eq!(panel.dtypes()[3], ("region".to_string(), Dtype::Utf8));

        let (column, partition) = &panel.columns()[1];
        let observed = panel.partition(*partition).unwrap();
        assert!(observed.contains(column));
        assert_eq!(Some(observed), panel.observed());
        assert!(panel.partition(Partition::Static).is_none());
    }

    #[test]
    fn test_setters_roll_back() {
        let mut panel = get_test_panel();
        let before = panel.clone();
        let clash = daily_series("2023-01-01", &[("sales", vec![1.0])]);
        assert!(panel.set_known(Some(clash)).unwrap_err().is_value());
        assert_eq!(panel, before);

        let clash = StaticCovariates::from([("temp".to_string(), Scalar::Int(1))]);
        assert!(panel.set_static(clash, true).unwrap_err().is_value());
        assert_eq!(panel, before);

        let extra = StaticCovariates::from([("store".to_string(), Scalar::Int(7))]);
        panel.set_static(extra.clone(), true).unwrap();
        assert_eq!(panel.static_covariates().map(|m| m.len()), Some(2));
        panel.set_static(extra, false).unwrap();
        assert_eq!(panel.static_covariates().map(|m| m.len()), Some(1));

        panel.set_observed(None).unwrap();
        assert!(panel.observed().is_none());
        assert!(panel.locate("temp").is_err());
    }
}
