use ftx_client::models::FundingPayment;
use ftx_client::models::SpotMarginHistory;

/// The rows of one sheet.
#[derive(Clone, Debug, PartialEq)]
pub enum MergedRows {
    /// Only funding payments, there were no margin borrows.
    Narrow(Vec<FundingPayment>),
    /// Funding payments next to margin borrows.
    Wide(Vec<WideRow>),
}

/// A funding payment and a margin borrow that ended up on the same row.
///
/// Either side is `None` once its series has run out.
#[derive(Clone, Debug, PartialEq)]
pub struct WideRow {
    pub funding: Option<FundingPayment>,
    pub margin: Option<SpotMarginHistory>,
}

impl MergedRows {
    pub fn len(&self) -> usize {
        match self {
            MergedRows::Narrow(rows) => rows.len(),
            MergedRows::Wide(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Put funding payments and margin borrows side by side.
///
/// The two series share no key. They are paired by position, the n-th payment next to the n-th
/// borrow, and the longer series determines the number of rows.
pub fn merge(funding: Vec<FundingPayment>, margin: Vec<SpotMarginHistory>) -> MergedRows {
    if margin.is_empty() {
        return MergedRows::Narrow(funding);
    }

    let rows = funding.len().max(margin.len());
    let mut funding = funding.into_iter();
    let mut margin = margin.into_iter();

    MergedRows::Wide(
        (0..rows)
            .map(|_| WideRow {
                funding: funding.next(),
                margin: margin.next(),
            })
            .collect(),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn payment(id: u64) -> FundingPayment {
        FundingPayment {
            future: "BTC-PERP".to_string(),
            id,
            payment: -0.5,
            rate: 0.0001,
            time: format!("2023-01-01T{id:02}:00:00+00:00"),
        }
    }

    pub(crate) fn borrow(hour: u32) -> SpotMarginHistory {
        SpotMarginHistory {
            coin: "USD".to_string(),
            cost: 0.02,
            rate: 0.000002,
            size: 10_000.0,
            time: format!("2023-01-01T{hour:02}:00:00+00:00"),
        }
    }

    #[test]
    fn without_margin_the_payments_are_kept_as_they_are() {
        let payments = vec![payment(1), payment(2)];

        assert_eq!(
            merge(payments.clone(), vec![]),
            MergedRows::Narrow(payments)
        );
    }

    #[test]
    fn longer_margin_series_drives_the_row_count() {
        let merged = merge(
            vec![payment(0), payment(1), payment(2)],
            (0..5).map(borrow).collect(),
        );

        let rows = match merged {
            MergedRows::Wide(rows) => rows,
            MergedRows::Narrow(_) => panic!("expected wide rows"),
        };
        assert_eq!(rows.len(), 5);
        assert!(rows[..3].iter().all(|row| row.funding.is_some()));
        assert!(rows[3..].iter().all(|row| row.funding.is_none()));
        assert!(rows.iter().all(|row| row.margin.is_some()));
        assert_eq!(rows[4].margin, Some(borrow(4)));
    }

    #[test]
    fn longer_funding_series_drives_the_row_count() {
        let merged = merge((0..4).map(payment).collect(), vec![borrow(0)]);

        assert_eq!(merged.len(), 4);
        assert_eq!(
            merged,
            MergedRows::Wide(vec![
                WideRow {
                    funding: Some(payment(0)),
                    margin: Some(borrow(0)),
                },
                WideRow {
                    funding: Some(payment(1)),
                    margin: None,
                },
                WideRow {
                    funding: Some(payment(2)),
                    margin: None,
                },
                WideRow {
                    funding: Some(payment(3)),
                    margin: None,
                },
            ])
        );
    }

    #[test]
    fn nothing_to_merge() {
        assert!(merge(vec![], vec![]).is_empty());
    }
}
