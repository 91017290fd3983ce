//! Callback shapes accepted by the visitation engine.
//!
//! A visitor either inspects only the value or also the field name, and either reports
//! acceptance (`false` fails the walk with an invalid-argument error) or always accepts.
//! The shape is picked once at the call site by wrapping the closure in one of the
//! adapters below:
//!
//! | adapter          | closure                          |
//! |------------------|----------------------------------|
//! | [`Checked`]      | `FnMut(value) -> bool`           |
//! | [`CheckedNamed`] | `FnMut(value, &str) -> bool`     |
//! | [`Each`]         | `FnMut(value)`                   |
//! | [`EachNamed`]    | `FnMut(value, &str)`             |
//!
//! `value` is [`FieldRef`](super::value::FieldRef) for shared walks and
//! [`FieldMut`](super::value::FieldMut) for exclusive ones.

pub trait FieldVisitor<V> {
    /// Returns `false` to reject the field.
    fn visit_field(&mut self, value: V, name: &str) -> bool;
}

impl<V, T: FieldVisitor<V> + ?Sized> FieldVisitor<V> for &mut T {
    fn visit_field(&mut self, value: V, name: &str) -> bool {
        (**self).visit_field(value, name)
    }
}

pub struct Checked<F>(pub F);

impl<V, F: FnMut(V) -> bool> FieldVisitor<V> for Checked<F> {
    fn visit_field(&mut self, value: V, _name: &str) -> bool {
        (self.0)(value)
    }
}

pub struct CheckedNamed<F>(pub F);

impl<V, F: FnMut(V, &str) -> bool> FieldVisitor<V> for CheckedNamed<F> {
    fn visit_field(&mut self, value: V, name: &str) -> bool {
        (self.0)(value, name)
    }
}

pub struct Each<F>(pub F);

impl<V, F: FnMut(V)> FieldVisitor<V> for Each<F> {
    fn visit_field(&mut self, value: V, _name: &str) -> bool {
        (self.0)(value);
        true
    }
}

pub struct EachNamed<F>(pub F);

impl<V, F: FnMut(V, &str)> FieldVisitor<V> for EachNamed<F> {
    fn visit_field(&mut self, value: V, name: &str) -> bool {
        (self.0)(value, name);
        true
    }
}

#[cfg(test)]
mod tests {
    //! Adapters must forward values and translate return conventions faithfully.
    use super::*;

    fn drive<V: FieldVisitor<u32>>(mut visitor: V) -> Vec<bool> {
        vec![visitor.visit_field(1, "one"), visitor.visit_field(2, "two")]
    }

    #[test]
    fn checked_forwards_the_verdict() {
        assert_eq!(drive(Checked(|value: u32| value == 1)), vec![true, false]);
    }

    #[test]
    fn named_variants_receive_names() {
        let mut seen = Vec::new();
        drive(EachNamed(|value: u32, name: &str| seen.push(format!("{name}={value}"))));
        assert_eq!(seen, ["one=1", "two=2"], "names should arrive alongside values");
        assert_eq!(
            drive(CheckedNamed(|_: u32, name: &str| name.starts_with('o'))),
            vec![true, false]
        );
    }

    #[test]
    fn unit_visitors_always_accept() {
        let mut total = 0;
        assert_eq!(drive(Each(|value: u32| total += value)), vec![true, true]);
        assert_eq!(total, 3);
    }

    #[test]
    fn mutable_references_forward() {
        let mut inner = Checked(|value: u32| value > 1);
        assert_eq!(drive(&mut inner), vec![false, true], "&mut visitors delegate to the target");
    }
}
