use std::collections::BTreeMap;

use rust_decimal::Decimal;
use storefront_api::domain::cart::{Cart, CartChange, CartLine};

const KEYS: [(&str, i64); 4] = [
    ("mango-milk", 549),
    ("mango-milk:3 pack", 1499),
    ("classic-dark-70", 449),
    ("oat-milk-hazelnut", 649),
];

fn line(index: usize) -> CartLine {
    let (key, price) = KEYS[index];
    let (product_id, pack_size) = match key.split_once(':') {
        Some((id, pack)) => (id, Some(pack.to_string())),
        None => (key, None),
    };
    CartLine {
        line_key: key.to_string(),
        product_id: product_id.to_string(),
        pack_size,
        name: key.to_string(),
        unit_price: Decimal::from(price),
        image_url: None,
        category: "bars".to_string(),
        quantity: 1,
    }
}

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn assert_consistent(cart: &Cart, model: &BTreeMap<usize, i32>) {
    let mut keys: Vec<&str> = cart.lines().iter().map(|l| l.line_key.as_str()).collect();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), cart.lines().len(), "duplicate line keys");

    for l in cart.lines() {
        assert!(l.quantity >= 1, "line {} has quantity {}", l.line_key, l.quantity);
    }

    let expected_items: i64 = model.values().map(|q| i64::from(*q)).sum();
    let expected_total: Decimal = model
        .iter()
        .map(|(i, q)| Decimal::from(KEYS[*i].1) * Decimal::from(*q))
        .sum();

    assert_eq!(cart.total_items(), expected_items);
    assert_eq!(cart.total_price(), expected_total);
    assert_eq!(
        cart.total_price(),
        cart.lines().iter().map(CartLine::line_total).sum::<Decimal>()
    );
}

#[test]
fn random_operation_sequences_keep_cart_invariants() {
    for seed in 0..200 {
        let mut rng = Lcg(seed);
        let mut cart = Cart::new();
        let mut model: BTreeMap<usize, i32> = BTreeMap::new();

        for _ in 0..60 {
            let idx = rng.below(KEYS.len() as u64) as usize;
            let key = KEYS[idx].0;
            match rng.below(10) {
                0..=4 => {
                    let qty = rng.below(5) as i32 - 1;
                    let change = cart.add_item(line(idx), qty);
                    let had = model.contains_key(&idx);
                    *model.entry(idx).or_insert(0) += qty.max(1);
                    if had {
                        assert!(matches!(change, CartChange::Updated(_)));
                    } else {
                        assert!(matches!(change, CartChange::Inserted(_)));
                    }
                }
                5..=7 => {
                    let qty = rng.below(6) as i32 - 2;
                    let before = model.get(&idx).copied();
                    let change = cart.update_quantity(key, qty);
                    match before {
                        None => assert_eq!(change, CartChange::Unchanged),
                        Some(_) if qty <= 0 => {
                            model.remove(&idx);
                            assert_eq!(change, CartChange::Removed(key.to_string()));
                        }
                        Some(_) => {
                            model.insert(idx, qty);
                        }
                    }
                }
                8 => {
                    let change = cart.remove_item(key);
                    if model.remove(&idx).is_some() {
                        assert_eq!(change, CartChange::Removed(key.to_string()));
                    } else {
                        assert_eq!(change, CartChange::Unchanged);
                    }
                }
                _ => {
                    cart.clear();
                    model.clear();
                }
            }
            assert_consistent(&cart, &model);
        }
    }
}

#[test]
fn rebuilding_from_lines_matches_original() {
    let mut rng = Lcg(42);
    let mut cart = Cart::new();
    for _ in 0..30 {
        let idx = rng.below(KEYS.len() as u64) as usize;
        cart.add_item(line(idx), rng.below(3) as i32 + 1);
    }

    let rebuilt = Cart::from_lines(cart.lines().to_vec());

    assert_eq!(rebuilt.total_items(), cart.total_items());
    assert_eq!(rebuilt.total_price(), cart.total_price());
}
