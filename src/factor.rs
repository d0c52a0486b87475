//! Names and captions of the swept factors
use std::fmt;

/// An experimental factor swept by the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Factor {
    /// Maximum depth of the trees
    Depth,
    /// Percentage of flipped training labels
    Outliers,
    /// Number of principal components kept
    Components,
    /// Replication factor of the dataset
    Multiplicity,
}

impl Factor {
    /// File stem of the histogram of a single value
    pub fn image_stem(&self, value: impl fmt::Display) -> String {
        let prefix = match self {
            Factor::Depth => "d",
            Factor::Outliers => "o",
            Factor::Components => "n",
            Factor::Multiplicity => "m",
        };
        format!("rf_{}{}", prefix, value)
    }

    /// File stem of the figure comparing all values
    pub fn aggregate_stem(&self) -> &'static str {
        match self {
            Factor::Depth => "max_depth",
            Factor::Outliers => "outliers",
            Factor::Components => "pca",
            Factor::Multiplicity => "mul",
        }
    }

    pub fn axis_label(&self) -> &'static str {
        match self {
            Factor::Depth => "max_depth",
            Factor::Outliers => "% outliers",
            Factor::Components => "components",
            Factor::Multiplicity => "multiplicity",
        }
    }

    /// Short description of a value, as used on the console
    pub fn describe(&self, value: impl fmt::Display) -> String {
        match self {
            Factor::Depth => format!("Depth {}", value),
            Factor::Outliers => format!("{}% outliers", value),
            Factor::Components => format!("{} PCA components", value),
            Factor::Multiplicity => format!("Multiplicity {}", value),
        }
    }

    /// Title of the histogram of a single value
    pub fn value_title(&self, value: impl fmt::Display) -> String {
        match self {
            Factor::Depth => format!("Accuracy for max_depth = {}", value),
            Factor::Outliers => format!("Accuracy with {}% outliers", value),
            Factor::Components => format!("Accuracy with {} PCA components", value),
            Factor::Multiplicity => format!("Accuracy with multiplicity {}", value),
        }
    }

    /// Caption of the histogram of the best value
    pub fn best_caption(&self, value: impl fmt::Display) -> String {
        match self {
            Factor::Depth => format!("Best: max_depth={}", value),
            Factor::Outliers => format!("Best: {}% outliers", value),
            Factor::Components => format!("Best: {} components", value),
            Factor::Multiplicity => format!("Best: multiplicity {}", value),
        }
    }

    /// Title of the figure comparing all values
    ///
    /// `context` is the number of experiments for depth and the group name for multiplicity.
    pub fn aggregate_title(&self, context: impl fmt::Display) -> String {
        match self {
            Factor::Depth => format!("Monte-Carlo analysis, {} experiments", context),
            Factor::Outliers => "Outlier analysis".to_string(),
            Factor::Components => "PCA dimensionality reduction analysis".to_string(),
            Factor::Multiplicity => format!("Multiplicity analysis of dataset {}", context),
        }
    }

    /// Console line of a single value
    pub fn summary(&self, value: impl fmt::Display, mean: f64) -> String {
        format!("{}: {:.2}%", self.describe(value), 100.0 * mean)
    }

    /// Console line of the best value
    pub fn best_summary(&self, value: impl fmt::Display, mean: f64) -> String {
        format!(
            "Best result: {} with {:.2}% accuracy",
            self.describe(value),
            100.0 * mean
        )
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Factor::Depth => "max_depth",
            Factor::Outliers => "outliers",
            Factor::Components => "pca",
            Factor::Multiplicity => "multiplicity",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_stems() {
        assert_eq!(Factor::Depth.image_stem(4), "rf_d4");
        assert_eq!(Factor::Outliers.image_stem(15), "rf_o15");
        assert_eq!(Factor::Components.image_stem(3), "rf_n3");
        assert_eq!(Factor::Multiplicity.image_stem(2), "rf_m2");
        assert_eq!(Factor::Multiplicity.aggregate_stem(), "mul");
    }

    #[test]
    fn console_lines() {
        assert_eq!(Factor::Depth.summary(5, 0.9234), "Depth 5: 92.34%");
        assert_eq!(
            Factor::Outliers.best_summary(10, 0.5),
            "Best result: 10% outliers with 50.00% accuracy"
        );
        assert_eq!(
            Factor::Depth.aggregate_title(100),
            "Monte-Carlo analysis, 100 experiments"
        );
    }
}
