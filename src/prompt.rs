use crate::error::{Result, SalesAnalyticsError};
use crate::schema::FilterCriteria;
use crate::utils::format_amount;
use crate::validation::FilterOptions;
use std::io::{BufRead, Write};

/// Interactive filter prompt over any line-based input and output.
pub struct FilterPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> FilterPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    fn ask_amount(&mut self, question: &str, field: &str) -> Result<Option<f64>> {
        let answer = self.ask(question)?;
        if answer.is_empty() {
            return Ok(None);
        }

        answer
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| SalesAnalyticsError::InvalidFilterInput {
                field: field.to_string(),
                value: answer.clone(),
            })
    }

    pub fn show_options(&mut self, options: &FilterOptions) -> Result<()> {
        writeln!(self.output, "Filter Options Available:")?;
        writeln!(self.output, "Regions: {}", options.regions.join(", "))?;
        match options.amount_range {
            Some((lo, hi)) => writeln!(
                self.output,
                "Amount Range: {} - {}",
                format_amount(lo),
                format_amount(hi)
            )?,
            None => writeln!(self.output, "Amount Range: N/A")?,
        }
        writeln!(self.output)?;
        Ok(())
    }

    /// Asks whether to filter and, if so, for each filter. Blank answers
    /// leave that filter unset. End of input counts as "no".
    pub fn read_criteria(&mut self) -> Result<FilterCriteria> {
        let choice = self.ask("Do you want to filter data? (y/n): ")?;
        if !choice.eq_ignore_ascii_case("y") {
            return Ok(FilterCriteria::default());
        }

        let region = self.ask("Enter region (or press Enter to skip): ")?;
        let min_amount = self.ask_amount("Enter minimum amount (or press Enter to skip): ", "minimum amount")?;
        let max_amount = self.ask_amount("Enter maximum amount (or press Enter to skip): ", "maximum amount")?;

        Ok(FilterCriteria {
            region: (!region.is_empty()).then_some(region),
            min_amount,
            max_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(input: &str) -> (Result<FilterCriteria>, String) {
        let mut output = Vec::new();
        let result = FilterPrompt::new(Cursor::new(input.as_bytes()), &mut output).read_criteria();
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_declining_sets_no_filters() {
        let (criteria, output) = run("n\n");
        assert!(criteria.unwrap().is_empty());
        assert!(output.contains("Do you want to filter data?"));
        assert!(!output.contains("Enter region"));
    }

    #[test]
    fn test_all_filters() {
        let (criteria, _) = run("Y\nNorth\n500\n1,500.50\n");
        let criteria = criteria.unwrap();
        assert_eq!(criteria.region.as_deref(), Some("North"));
        assert_eq!(criteria.min_amount, Some(500.0));
        assert_eq!(criteria.max_amount, Some(1500.5));
    }

    #[test]
    fn test_blank_answers_skip_filters() {
        let (criteria, _) = run("y\n\n\n250\n");
        let criteria = criteria.unwrap();
        assert_eq!(criteria.region, None);
        assert_eq!(criteria.min_amount, None);
        assert_eq!(criteria.max_amount, Some(250.0));
    }

    #[test]
    fn test_end_of_input_means_no() {
        let (criteria, _) = run("");
        assert!(criteria.unwrap().is_empty());
    }

    #[test]
    fn test_bad_amount_is_an_error() {
        let (criteria, _) = run("y\n\nlots\n");
        assert!(matches!(
            criteria,
            Err(SalesAnalyticsError::InvalidFilterInput { .. })
        ));
    }

    #[test]
    fn test_show_options() {
        let mut output = Vec::new();
        let options = FilterOptions {
            regions: vec!["East".to_string(), "North".to_string()],
            amount_range: Some((120.0, 45000.0)),
        };
        FilterPrompt::new(Cursor::new(&b""[..]), &mut output)
            .show_options(&options)
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Regions: East, North"));
        assert!(text.contains("Amount Range: 120.00 - 45,000.00"));
    }
}
