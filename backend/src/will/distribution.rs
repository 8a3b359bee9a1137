use serde::{Deserialize, Serialize};

use super::{Address, Beneficiary};

/// Amount owed to one beneficiary when a will executes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub address: Address,
    pub amount: u64,
}

/// Splits `balance` across `beneficiaries` by percentage.
///
/// Each share is `floor(balance * percentage / 100)`. Whatever truncation
/// leaves over goes to the last beneficiary in insertion order, so the shares
/// always add up to `balance` exactly. An empty list yields no shares.
pub fn compute_shares(balance: u64, beneficiaries: &[Beneficiary]) -> Vec<Share> {
    let mut shares: Vec<Share> = beneficiaries
        .iter()
        .map(|b| Share {
            address: b.address.clone(),
            amount: (balance as u128 * b.percentage as u128 / 100) as u64,
        })
        .collect();

    let assigned: u128 = shares.iter().map(|s| s.amount as u128).sum();
    if let Some(last) = shares.last_mut() {
        last.amount += (balance as u128).saturating_sub(assigned) as u64;
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn beneficiary(n: u8, percentage: u32) -> Beneficiary {
        Beneficiary {
            address: Address::parse(&format!("0x{:040x}", n)).unwrap(),
            percentage,
            name: None,
        }
    }

    fn amounts(shares: &[Share]) -> Vec<u64> {
        shares.iter().map(|s| s.amount).collect()
    }

    #[test]
    fn test_even_split() {
        let shares = compute_shares(100, &[beneficiary(1, 60), beneficiary(2, 40)]);
        assert_eq!(amounts(&shares), vec![60, 40]);
        assert_eq!(shares[0].address, beneficiary(1, 60).address);
    }

    #[test]
    fn test_remainder_goes_to_last() {
        let shares = compute_shares(
            100,
            &[beneficiary(1, 33), beneficiary(2, 33), beneficiary(3, 34)],
        );
        assert_eq!(amounts(&shares), vec![33, 33, 34]);

        let shares = compute_shares(
            10,
            &[beneficiary(1, 33), beneficiary(2, 33), beneficiary(3, 34)],
        );
        assert_eq!(amounts(&shares), vec![3, 3, 4]);

        let shares = compute_shares(1, &[beneficiary(1, 50), beneficiary(2, 50)]);
        assert_eq!(amounts(&shares), vec![0, 1]);
    }

    #[test]
    fn test_zero_balance_and_no_beneficiaries() {
        assert_eq!(amounts(&compute_shares(0, &[beneficiary(1, 100)])), vec![0]);
        assert!(compute_shares(500, &[]).is_empty());
    }

    #[test]
    fn test_large_balance_does_not_overflow() {
        let shares = compute_shares(u64::MAX, &[beneficiary(1, 99), beneficiary(2, 1)]);
        assert_eq!(shares.iter().map(|s| s.amount as u128).sum::<u128>(), u64::MAX as u128);
    }

    /// Percentages between 1 and 100 over at most ten beneficiaries, summing to 100.
    fn complete_allocation() -> impl Strategy<Value = Vec<u32>> {
        proptest::collection::vec(1u32..=100, 1..=10).prop_map(|weights| {
            let mut out = Vec::new();
            let mut left = 100u32;
            for (i, w) in weights.iter().enumerate() {
                let slots_after = (weights.len() - i - 1) as u32;
                if slots_after == 0 || left <= slots_after + 1 {
                    break;
                }
                let p = (w % (left - slots_after)).max(1);
                out.push(p);
                left -= p;
            }
            out.push(left);
            out
        })
    }

    proptest! {
        #[test]
        fn prop_shares_preserve_balance(
            balance in any::<u64>(),
            percentages in complete_allocation(),
        ) {
            prop_assert_eq!(percentages.iter().sum::<u32>(), 100);
            let beneficiaries: Vec<_> = percentages
                .iter()
                .enumerate()
                .map(|(i, p)| beneficiary(i as u8 + 1, *p))
                .collect();

            let shares = compute_shares(balance, &beneficiaries);
            prop_assert_eq!(shares.len(), beneficiaries.len());
            let total: u128 = shares.iter().map(|s| s.amount as u128).sum();
            prop_assert_eq!(total, balance as u128);
            for (share, b) in shares.iter().zip(&beneficiaries).take(shares.len() - 1) {
                prop_assert_eq!(share.amount as u128, balance as u128 * b.percentage as u128 / 100);
            }
        }
    }
}
