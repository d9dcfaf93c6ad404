//! The algebraic simplification core behind the symbolic tier.
//!
//! Expressions are normalised into a single rational function `N/D`,
//! where `N` and `D` are multivariate polynomials with exact rational
//! coefficients over *kernels*: symbols, hinted constants, and
//! uninterpreted function applications whose arguments are themselves
//! normalised. Monomial exponents are rationals, which is valid under
//! the working assumption that all free symbols are positive reals.
//!
//! Two expressions are symbolically equal iff the numerator of the
//! normal form of their difference reduces to the zero polynomial after
//! the trigonometric and imaginary-unit reductions. Anything the core
//! cannot faithfully represent surfaces as [`Unsupported`], which the
//! engine treats as "unknown" and escalates past.

use std::collections::BTreeMap;

use num::bigint::BigInt;
use num::integer::Roots;
use num::rational::BigRational;
use num::{FromPrimitive, One, Signed, ToPrimitive, Zero};

use crate::ast::{Constant, Decimal, Expr, Function};

/// The core gave up: the input uses a construct it cannot represent
/// faithfully (or would blow its size budget trying).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsupported(pub String);

type SimpResult<T> = Result<T, Unsupported>;

/// Largest integer exponent expanded polynomially.
const MAX_EXPONENT: i64 = 1024;
/// Term-count budget for any intermediate polynomial.
const MAX_TERMS: usize = 50_000;
/// Trial-division bound for splitting logarithms of integers.
const LOG_FACTOR_BOUND: u64 = 1000;

fn unsupported(reason: &str) -> Unsupported {
    Unsupported(reason.to_string())
}

/// A power product of kernels with positive rational exponents.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Monomial(BTreeMap<Expr, BigRational>);

impl Monomial {
    fn one() -> Self {
        Monomial(BTreeMap::new())
    }

    fn is_one(&self) -> bool {
        self.0.is_empty()
    }

    fn generator(kernel: Expr, exponent: BigRational) -> Self {
        let mut map = BTreeMap::new();
        if !exponent.is_zero() {
            map.insert(kernel, exponent);
        }
        Monomial(map)
    }

    fn mul(&self, other: &Monomial) -> Monomial {
        let mut map = self.0.clone();
        for (kernel, exponent) in &other.0 {
            let entry = map.entry(kernel.clone()).or_insert_with(BigRational::zero);
            *entry += exponent;
            if entry.is_zero() {
                map.remove(kernel);
            }
        }
        Monomial(map)
    }

    fn to_expr(&self) -> Expr {
        let mut factors = Vec::new();
        for (kernel, exponent) in &self.0 {
            if exponent.is_one() {
                factors.push(kernel.clone());
            } else {
                factors.push(Expr::pow(kernel.clone(), rational_to_expr(exponent)));
            }
        }
        match factors.len() {
            0 => Expr::integer(1),
            1 => factors.pop().unwrap(),
            _ => Expr::Mul(factors),
        }
    }
}

/// Sparse multivariate polynomial over kernels.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Poly(BTreeMap<Monomial, BigRational>);

impl Poly {
    fn zero() -> Self {
        Poly(BTreeMap::new())
    }

    fn one() -> Self {
        Poly::constant(BigRational::one())
    }

    fn constant(value: BigRational) -> Self {
        let mut map = BTreeMap::new();
        if !value.is_zero() {
            map.insert(Monomial::one(), value);
        }
        Poly(map)
    }

    fn from_term(monomial: Monomial, coefficient: BigRational) -> Self {
        let mut map = BTreeMap::new();
        if !coefficient.is_zero() {
            map.insert(monomial, coefficient);
        }
        Poly(map)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    fn add(&self, other: &Poly) -> Poly {
        let mut map = self.0.clone();
        for (monomial, coefficient) in &other.0 {
            let entry = map
                .entry(monomial.clone())
                .or_insert_with(BigRational::zero);
            *entry += coefficient;
            if entry.is_zero() {
                map.remove(monomial);
            }
        }
        Poly(map)
    }

    fn neg(&self) -> Poly {
        Poly(self.0.iter().map(|(m, c)| (m.clone(), -c)).collect())
    }

    fn sub(&self, other: &Poly) -> Poly {
        self.add(&other.neg())
    }

    fn mul(&self, other: &Poly) -> SimpResult<Poly> {
        let mut map: BTreeMap<Monomial, BigRational> = BTreeMap::new();
        for (ma, ca) in &self.0 {
            for (mb, cb) in &other.0 {
                let monomial = ma.mul(mb);
                let entry = map.entry(monomial).or_insert_with(BigRational::zero);
                *entry += ca * cb;
            }
            if map.len() > MAX_TERMS {
                return Err(unsupported("polynomial too large"));
            }
        }
        map.retain(|_, c| !c.is_zero());
        Ok(Poly(map))
    }

    fn pow(&self, exponent: u64) -> SimpResult<Poly> {
        let mut result = Poly::one();
        let mut base = self.clone();
        let mut remaining = exponent;
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.mul(&base)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.mul(&base)?;
            }
        }
        Ok(result)
    }

    fn as_constant(&self) -> Option<BigRational> {
        match self.0.len() {
            0 => Some(BigRational::zero()),
            1 => {
                let (monomial, coefficient) = self.0.iter().next().unwrap();
                monomial.is_one().then(|| coefficient.clone())
            }
            _ => None,
        }
    }

    fn as_single_term(&self) -> Option<(Monomial, BigRational)> {
        if self.0.len() == 1 {
            let (m, c) = self.0.iter().next().unwrap();
            Some((m.clone(), c.clone()))
        } else {
            None
        }
    }

    fn leading_coefficient(&self) -> Option<&BigRational> {
        self.0.values().next()
    }

    fn to_expr(&self) -> Expr {
        let mut terms = Vec::new();
        for (monomial, coefficient) in &self.0 {
            let factor = monomial.to_expr();
            let term = if coefficient.is_one() {
                factor
            } else if monomial.is_one() {
                rational_to_expr(coefficient)
            } else if *coefficient == -BigRational::one() {
                Expr::neg(factor)
            } else {
                Expr::Mul(vec![rational_to_expr(coefficient), factor])
            };
            terms.push(term);
        }
        match terms.len() {
            0 => Expr::integer(0),
            1 => terms.pop().unwrap(),
            _ => Expr::Add(terms),
        }
    }
}

fn rational_to_expr(value: &BigRational) -> Expr {
    if value.is_integer() {
        Expr::Integer(value.to_integer())
    } else {
        Expr::rational(value.numer().clone(), value.denom().clone())
    }
}

/// A ratio of polynomials; the normal form of an expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fraction {
    num: Poly,
    den: Poly,
}

impl Fraction {
    fn constant(value: BigRational) -> Self {
        Fraction {
            num: Poly::constant(value),
            den: Poly::one(),
        }
    }

    fn zero() -> Self {
        Fraction::constant(BigRational::zero())
    }

    fn one() -> Self {
        Fraction::constant(BigRational::one())
    }

    fn generator(kernel: Expr) -> Self {
        Fraction {
            num: Poly::from_term(
                Monomial::generator(kernel, BigRational::one()),
                BigRational::one(),
            ),
            den: Poly::one(),
        }
    }

    /// A single kernel raised to a rational power; negative powers live in
    /// the denominator so polynomials keep non-negative exponents.
    fn generator_pow(kernel: Expr, exponent: BigRational) -> Self {
        if exponent.is_zero() {
            return Fraction::one();
        }
        if exponent.is_positive() {
            Fraction {
                num: Poly::from_term(Monomial::generator(kernel, exponent), BigRational::one()),
                den: Poly::one(),
            }
        } else {
            Fraction {
                num: Poly::one(),
                den: Poly::from_term(
                    Monomial::generator(kernel, -exponent),
                    BigRational::one(),
                ),
            }
        }
    }

    fn add(&self, other: &Fraction) -> SimpResult<Fraction> {
        if self.den == other.den {
            return Ok(Fraction {
                num: self.num.add(&other.num),
                den: self.den.clone(),
            });
        }
        Ok(Fraction {
            num: self.num.mul(&other.den)?.add(&other.num.mul(&self.den)?),
            den: self.den.mul(&other.den)?,
        })
    }

    fn mul(&self, other: &Fraction) -> SimpResult<Fraction> {
        Ok(Fraction {
            num: self.num.mul(&other.num)?,
            den: self.den.mul(&other.den)?,
        })
    }

    fn neg(&self) -> Fraction {
        Fraction {
            num: self.num.neg(),
            den: self.den.clone(),
        }
    }

    fn recip(&self) -> SimpResult<Fraction> {
        if self.num.is_zero() {
            return Err(unsupported("division by zero"));
        }
        Ok(Fraction {
            num: self.den.clone(),
            den: self.num.clone(),
        })
    }

    fn pow_int(&self, exponent: i64) -> SimpResult<Fraction> {
        if exponent.unsigned_abs() > MAX_EXPONENT as u64 {
            return Err(unsupported("exponent too large"));
        }
        let base = if exponent < 0 {
            self.recip()?
        } else {
            self.clone()
        };
        Ok(Fraction {
            num: base.num.pow(exponent.unsigned_abs())?,
            den: base.den.pow(exponent.unsigned_abs())?,
        })
    }

    fn as_constant(&self) -> Option<BigRational> {
        let num = self.num.as_constant()?;
        let den = self.den.as_constant()?;
        if den.is_zero() {
            None
        } else {
            Some(num / den)
        }
    }

    /// Pull an overall sign out, leaving a normal form whose leading
    /// numerator coefficient is positive. Used for parity rewrites.
    fn extract_sign(&self) -> (bool, Fraction) {
        let mut fraction = self.clone();
        let den_negative = fraction
            .den
            .leading_coefficient()
            .map(|c| c.is_negative())
            .unwrap_or(false);
        if den_negative {
            fraction = Fraction {
                num: fraction.num.neg(),
                den: fraction.den.neg(),
            };
        }
        let num_negative = fraction
            .num
            .leading_coefficient()
            .map(|c| c.is_negative())
            .unwrap_or(false);
        if num_negative {
            (
                true,
                Fraction {
                    num: fraction.num.neg(),
                    den: fraction.den,
                },
            )
        } else {
            (false, fraction)
        }
    }

    /// Render back to a canonical expression tree.
    pub fn to_expr(&self) -> Expr {
        let num = self.num.to_expr();
        if self.den.as_constant().map(|c| c.is_one()) == Some(true) {
            num.canonical()
        } else {
            Expr::div(num, self.den.to_expr()).canonical()
        }
    }
}

fn posify_safe(kernel: &Expr) -> bool {
    matches!(
        kernel,
        Expr::Symbol(_)
            | Expr::Constant(Constant::E)
            | Expr::Constant(Constant::Pi)
            | Expr::Func(Function::Exp, _)
            | Expr::Func(Function::Abs, _)
    )
}

/// Normalise an expression into its rational-function form.
pub fn normalize(expr: &Expr) -> SimpResult<Fraction> {
    match expr {
        Expr::Integer(n) => Ok(Fraction::constant(BigRational::from_integer(n.clone()))),
        Expr::Rational(n, d) => Ok(Fraction::constant(BigRational::new(n.clone(), d.clone()))),
        Expr::Float(Decimal(f)) => {
            let value = BigRational::from_float(*f)
                .ok_or_else(|| unsupported("non-finite float"))?;
            Ok(Fraction::constant(value))
        }
        Expr::Symbol(name) => Ok(Fraction::generator(Expr::symbol(name.clone()))),
        Expr::Constant(c) => Ok(Fraction::generator(Expr::Constant(*c))),
        Expr::Add(children) => {
            let mut sum = Fraction::zero();
            for child in children {
                sum = sum.add(&normalize(child)?)?;
            }
            Ok(sum)
        }
        Expr::Mul(children) => {
            let mut product = Fraction::one();
            for child in children {
                product = product.mul(&normalize(child)?)?;
            }
            Ok(product)
        }
        Expr::Pow(base, exponent) => normalize_pow(base, exponent),
        Expr::Func(function, args) => normalize_func(*function, args),
        Expr::Bool(_)
        | Expr::Eq(_, _)
        | Expr::Rel(_, _, _)
        | Expr::And(_)
        | Expr::Or(_)
        | Expr::Xor(_)
        | Expr::Not(_)
        | Expr::Implies(_, _) => Err(unsupported("not an algebraic expression")),
    }
}

fn normalize_pow(base: &Expr, exponent: &Expr) -> SimpResult<Fraction> {
    let exponent_fraction = normalize(exponent)?;
    match exponent_fraction.as_constant() {
        Some(q) if q.is_integer() => {
            let k = q
                .to_integer()
                .to_i64()
                .ok_or_else(|| unsupported("exponent too large"))?;
            normalize(base)?.pow_int(k)
        }
        Some(q) => {
            let base_fraction = normalize(base)?;
            match fractional_power(&base_fraction, &q)? {
                Some(result) => Ok(result),
                None => Ok(Fraction::generator(Expr::pow(
                    base_fraction.to_expr(),
                    rational_to_expr(&q),
                ))),
            }
        }
        None => {
            let base_fraction = normalize(base)?;
            Ok(Fraction::generator(Expr::pow(
                base_fraction.to_expr(),
                exponent_fraction.to_expr(),
            )))
        }
    }
}

/// `(c * g1^e1 * ...)^q` for non-integer rational `q`, when every factor
/// can take a fractional power soundly (positive-reals assumption for
/// symbol kernels). Returns `None` when it cannot be done.
fn fractional_power(base: &Fraction, q: &BigRational) -> SimpResult<Option<Fraction>> {
    let Some((num_m, num_c)) = base.num.as_single_term() else {
        return Ok(None);
    };
    let Some((den_m, den_c)) = base.den.as_single_term() else {
        return Ok(None);
    };
    let coefficient = num_c / den_c;
    if !coefficient.is_positive() {
        return Ok(None);
    }
    let Some(root) = rational_power_exact(&coefficient, q) else {
        // A pure constant with no exact root still makes a clean kernel
        // like 2**(1/2); anything with other factors attached does not.
        if num_m.is_one() && den_m.is_one() {
            return Ok(Some(Fraction::generator(Expr::pow(
                rational_to_expr(&coefficient),
                rational_to_expr(q),
            ))));
        }
        return Ok(None);
    };
    let mut result = Fraction::constant(root);
    for (kernel, exponent) in num_m.0.iter() {
        if !posify_safe(kernel) {
            return Ok(None);
        }
        result = result.mul(&Fraction::generator_pow(kernel.clone(), exponent * q))?;
    }
    for (kernel, exponent) in den_m.0.iter() {
        if !posify_safe(kernel) {
            return Ok(None);
        }
        result = result.mul(&Fraction::generator_pow(kernel.clone(), -(exponent * q)))?;
    }
    Ok(Some(result))
}

/// Exact `c^q` for positive rational `c` and rational `q`, when the root
/// is itself rational.
fn rational_power_exact(c: &BigRational, q: &BigRational) -> Option<BigRational> {
    if c.is_one() {
        return Some(BigRational::one());
    }
    let root_index = q.denom().to_u32()?;
    let power = q.numer().to_i64()?;
    if power.unsigned_abs() > MAX_EXPONENT as u64 {
        return None;
    }
    let numer_root = exact_nth_root(c.numer(), root_index)?;
    let denom_root = exact_nth_root(c.denom(), root_index)?;
    let mut result = BigRational::new(numer_root, denom_root);
    if power < 0 {
        result = result.recip();
    }
    let mut acc = BigRational::one();
    for _ in 0..power.unsigned_abs() {
        acc = acc * &result;
    }
    Some(acc)
}

fn exact_nth_root(n: &BigInt, index: u32) -> Option<BigInt> {
    if index == 1 {
        return Some(n.clone());
    }
    if n.is_negative() {
        return None;
    }
    let root = n.nth_root(index);
    if num::pow::pow(root.clone(), index as usize) == *n {
        Some(root)
    } else {
        None
    }
}

fn normalize_func(function: Function, args: &[Expr]) -> SimpResult<Fraction> {
    match function {
        // Reciprocal and ratio trig collapse onto sin and cos.
        Function::Tan => rewrite_ratio(args, Function::Sin, Function::Cos),
        Function::Cot => rewrite_ratio(args, Function::Cos, Function::Sin),
        Function::Sec => rewrite_reciprocal(args, Function::Cos),
        Function::Csc => rewrite_reciprocal(args, Function::Sin),
        // The hyperbolic family lives in the exponential world, which
        // makes its Pythagorean identity fall out of fraction arithmetic.
        Function::Sinh => {
            let (plus, minus) = exp_pair(&args[0])?;
            plus.add(&minus.neg())?
                .mul(&Fraction::constant(BigRational::new(1.into(), 2.into())))
        }
        Function::Cosh => {
            let (plus, minus) = exp_pair(&args[0])?;
            plus.add(&minus)?
                .mul(&Fraction::constant(BigRational::new(1.into(), 2.into())))
        }
        Function::Tanh => {
            let (plus, minus) = exp_pair(&args[0])?;
            plus.add(&minus.neg())?.mul(&plus.add(&minus)?.recip()?)
        }
        Function::Csch => normalize_func(Function::Sinh, args)?.recip(),
        Function::Sech => normalize_func(Function::Cosh, args)?.recip(),
        Function::Coth => normalize_func(Function::Tanh, args)?.recip(),
        Function::Exp => exp_fraction(&normalize(&args[0])?),
        Function::Log => match args.len() {
            1 => ln_fraction(&normalize(&args[0])?),
            2 => {
                let numerator = ln_fraction(&normalize(&args[0])?)?;
                let denominator = ln_fraction(&normalize(&args[1])?)?;
                numerator.mul(&denominator.recip()?)
            }
            _ => Err(unsupported("log arity")),
        },
        Function::Abs => {
            let (_, magnitude) = normalize(&args[0])?.extract_sign();
            let all_safe = |poly: &Poly| {
                poly.as_single_term().is_some_and(|(m, _)| {
                    m.0.keys().all(posify_safe)
                })
            };
            if all_safe(&magnitude.num) && all_safe(&magnitude.den) {
                Ok(magnitude)
            } else {
                Ok(Fraction::generator(Expr::Func(
                    Function::Abs,
                    vec![magnitude.to_expr()],
                )))
            }
        }
        Function::Factorial => {
            let inner = normalize(&args[0])?;
            if let Some(value) = inner.as_constant() {
                if value.is_integer() && !value.is_negative() {
                    if let Some(n) = value.to_integer().to_u64() {
                        if n <= 50 {
                            let mut acc = BigInt::one();
                            for k in 2..=n {
                                acc *= BigInt::from_u64(k).unwrap();
                            }
                            return Ok(Fraction::constant(BigRational::from_integer(acc)));
                        }
                    }
                    return Err(unsupported("factorial too large"));
                }
            }
            Ok(Fraction::generator(Expr::Func(
                Function::Factorial,
                vec![inner.to_expr()],
            )))
        }
        Function::Derivative => {
            // Opaque to the symbolic tier; the derivand is still put in
            // normal form so equivalent spellings share a kernel.
            let derivand = normalize(&args[0])?.to_expr();
            let mut kernel_args = vec![derivand];
            kernel_args.extend(args[1..].iter().map(|a| a.canonical()));
            Ok(Fraction::generator(
                Expr::Func(Function::Derivative, kernel_args).canonical(),
            ))
        }
        // Parity-aware opaque kernels.
        Function::Sin
        | Function::Asin
        | Function::Atan
        | Function::Acsc
        | Function::Acot
        | Function::Asinh
        | Function::Atanh
        | Function::Acsch
        | Function::Acoth => odd_kernel(function, &args[0]),
        Function::Cos => even_kernel(function, &args[0]),
        // No parity rule applies.
        Function::Acos | Function::Asec | Function::Acosh | Function::Asech => {
            let inner = normalize(&args[0])?;
            Ok(Fraction::generator(Expr::Func(
                function,
                vec![inner.to_expr()],
            )))
        }
    }
}

fn rewrite_ratio(args: &[Expr], top: Function, bottom: Function) -> SimpResult<Fraction> {
    let numerator = normalize_func(top, args)?;
    let denominator = normalize_func(bottom, args)?;
    numerator.mul(&denominator.recip()?)
}

fn rewrite_reciprocal(args: &[Expr], inner: Function) -> SimpResult<Fraction> {
    normalize_func(inner, args)?.recip()
}

/// `(exp(u), exp(-u))` for the hyperbolic rewrites.
fn exp_pair(arg: &Expr) -> SimpResult<(Fraction, Fraction)> {
    let u = normalize(arg)?;
    let plus = exp_fraction(&u)?;
    let minus = exp_fraction(&u.neg())?;
    Ok((plus, minus))
}

/// An odd function of a sign-normalised argument: `f(-u) = -f(u)`.
fn odd_kernel(function: Function, arg: &Expr) -> SimpResult<Fraction> {
    let (negative, magnitude) = normalize(arg)?.extract_sign();
    let kernel = Fraction::generator(Expr::Func(function, vec![magnitude.to_expr()]));
    if negative {
        Ok(kernel.neg())
    } else {
        Ok(kernel)
    }
}

/// An even function of a sign-normalised argument: `f(-u) = f(u)`.
fn even_kernel(function: Function, arg: &Expr) -> SimpResult<Fraction> {
    let (_, magnitude) = normalize(arg)?.extract_sign();
    Ok(Fraction::generator(Expr::Func(
        function,
        vec![magnitude.to_expr()],
    )))
}

/// `exp` of a normalised argument: sums split multiplicatively, rational
/// multiples become powers of a shared kernel, `exp(q*ln v)` folds to
/// `v^q`, and the constant part becomes a power of `e`.
fn exp_fraction(arg: &Fraction) -> SimpResult<Fraction> {
    let Some(scale) = arg.den.as_constant() else {
        return Ok(Fraction::generator(Expr::Func(
            Function::Exp,
            vec![arg.to_expr()],
        )));
    };
    let mut result = Fraction::one();
    for (monomial, coefficient) in arg.num.0.iter() {
        let weight = coefficient / &scale;
        if monomial.is_one() {
            result = result.mul(&Fraction::generator_pow(
                Expr::Constant(Constant::E),
                weight,
            ))?;
            continue;
        }
        // exp(q * ln v) = v**q under the positivity assumption.
        if monomial.0.len() == 1 {
            let (kernel, exponent) = monomial.0.iter().next().unwrap();
            if exponent.is_one() {
                if let Expr::Func(Function::Log, log_args) = kernel {
                    if log_args.len() == 1 {
                        let folded = normalize_pow(
                            &log_args[0],
                            &rational_to_expr(&weight),
                        )?;
                        result = result.mul(&folded)?;
                        continue;
                    }
                }
            }
        }
        result = result.mul(&Fraction::generator_pow(
            Expr::Func(Function::Exp, vec![monomial.to_expr()]),
            weight,
        ))?;
    }
    Ok(result)
}

/// The natural logarithm of a normalised argument, expanded across
/// products, powers and rational constants where positivity allows.
fn ln_fraction(arg: &Fraction) -> SimpResult<Fraction> {
    ln_poly(&arg.num)?.add(&ln_poly(&arg.den)?.neg())
}

fn ln_poly(poly: &Poly) -> SimpResult<Fraction> {
    if let Some(constant) = poly.as_constant() {
        return ln_rational(&constant);
    }
    if let Some((monomial, coefficient)) = poly.as_single_term() {
        if monomial.0.keys().all(posify_safe) && coefficient.is_positive() {
            let mut sum = ln_rational(&coefficient)?;
            for (kernel, exponent) in monomial.0.iter() {
                let term = ln_kernel(kernel)?
                    .mul(&Fraction::constant(exponent.clone()))?;
                sum = sum.add(&term)?;
            }
            return Ok(sum);
        }
    }
    Ok(Fraction::generator(Expr::Func(
        Function::Log,
        vec![poly.to_expr()],
    )))
}

fn ln_kernel(kernel: &Expr) -> SimpResult<Fraction> {
    match kernel {
        Expr::Constant(Constant::E) => Ok(Fraction::one()),
        Expr::Func(Function::Exp, args) => normalize(&args[0]),
        _ => Ok(Fraction::generator(Expr::Func(
            Function::Log,
            vec![kernel.clone()],
        ))),
    }
}

fn ln_rational(value: &BigRational) -> SimpResult<Fraction> {
    if !value.is_positive() {
        return Err(unsupported("log of non-positive constant"));
    }
    if value.is_one() {
        return Ok(Fraction::zero());
    }
    ln_integer(value.numer())?.add(&ln_integer(value.denom())?.neg())
}

/// `ln` of a positive integer, split into prime factors below a small
/// bound so `ln 10 = ln 2 + ln 5` and `ln 4 = 2 ln 2` share kernels.
fn ln_integer(n: &BigInt) -> SimpResult<Fraction> {
    if n.is_one() {
        return Ok(Fraction::zero());
    }
    let mut remaining = n.clone();
    let mut sum = Fraction::zero();
    let mut p = 2u64;
    while p < LOG_FACTOR_BOUND {
        let prime = BigInt::from_u64(p).unwrap();
        let mut count = 0u32;
        while (&remaining % &prime).is_zero() {
            remaining /= &prime;
            count += 1;
        }
        if count > 0 {
            let kernel = Fraction::generator(Expr::Func(
                Function::Log,
                vec![Expr::Integer(prime)],
            ));
            sum = sum.add(&kernel.mul(&Fraction::constant(BigRational::from_u32(count).unwrap()))?)?;
        }
        if remaining.is_one() {
            return Ok(sum);
        }
        p += if p == 2 { 1 } else { 2 };
    }
    let leftover = Fraction::generator(Expr::Func(
        Function::Log,
        vec![Expr::Integer(remaining)],
    ));
    sum.add(&leftover)
}

/// Reduce a polynomial modulo `sin(u)^2 + cos(u)^2 - 1` (for every
/// argument `u`) and the imaginary-unit relation `i^2 = -1`.
fn reduce(poly: Poly) -> SimpResult<Poly> {
    let mut current = poly;
    let two = BigRational::from_u32(2).unwrap();
    for _ in 0..10_000 {
        let mut target = None;
        'search: for (monomial, _) in current.0.iter() {
            for (kernel, exponent) in monomial.0.iter() {
                if let Expr::Func(Function::Sin, args) = kernel {
                    if *exponent >= two {
                        target = Some((monomial.clone(), args[0].clone()));
                        break 'search;
                    }
                }
            }
        }
        let Some((monomial, sin_arg)) = target else {
            return Ok(reduce_imaginary(current));
        };
        let coefficient = match current.0.get(&monomial) {
            Some(c) => c.clone(),
            None => continue,
        };
        let sin_kernel = Expr::Func(Function::Sin, vec![sin_arg.clone()]);
        let cos_kernel = Expr::Func(Function::Cos, vec![sin_arg]);
        // m = rest * sin^e  ->  rest * sin^(e-2) * (1 - cos^2)
        let mut rest = monomial.clone();
        let exponent = rest.0.get(&sin_kernel).cloned().unwrap();
        let lowered = &exponent - &two;
        if lowered.is_zero() {
            rest.0.remove(&sin_kernel);
        } else {
            rest.0.insert(sin_kernel.clone(), lowered);
        }
        let with_cos = rest.mul(&Monomial::generator(cos_kernel, two.clone()));
        let replacement = Poly::from_term(rest, coefficient.clone())
            .add(&Poly::from_term(with_cos, -coefficient.clone()));
        current = current
            .sub(&Poly::from_term(monomial, coefficient))
            .add(&replacement);
    }
    Err(unsupported("trigonometric reduction did not terminate"))
}

fn reduce_imaginary(poly: Poly) -> Poly {
    let i_kernel = Expr::Constant(Constant::I);
    let mut result = Poly::zero();
    for (monomial, coefficient) in poly.0.iter() {
        let Some(exponent) = monomial.0.get(&i_kernel) else {
            result = result.add(&Poly::from_term(monomial.clone(), coefficient.clone()));
            continue;
        };
        if !exponent.is_integer() {
            result = result.add(&Poly::from_term(monomial.clone(), coefficient.clone()));
            continue;
        }
        let k = exponent.to_integer();
        let four = BigInt::from_u8(4).unwrap();
        let residue = ((&k % &four) + &four) % &four;
        let mut reduced = monomial.clone();
        reduced.0.remove(&i_kernel);
        let residue = residue.to_u8().unwrap();
        if residue == 1 || residue == 3 {
            reduced = reduced.mul(&Monomial::generator(i_kernel.clone(), BigRational::one()));
        }
        let sign = if residue >= 2 { -coefficient } else { coefficient.clone() };
        result = result.add(&Poly::from_term(reduced, sign));
    }
    result
}

/// Decide whether `expr` is identically zero under the positive-reals
/// rewrite system. This is the symbolic tier's zero test.
pub fn is_zero(expr: &Expr) -> SimpResult<bool> {
    let fraction = normalize(expr)?;
    let reduced = reduce(fraction.num)?;
    Ok(reduced.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::maths::{parse_expr as parse_maths, MathsContext};

    fn diff_is_zero(a: &str, b: &str) -> bool {
        let ctx = MathsContext::new();
        let left = parse_maths(a, &ctx).unwrap();
        let right = parse_maths(b, &ctx).unwrap();
        let difference = Expr::Add(vec![left, Expr::neg(right)]);
        is_zero(&difference).unwrap()
    }

    #[test]
    fn constant_arithmetic_folds() {
        assert!(diff_is_zero("2+3", "5"));
        assert!(diff_is_zero("2*3", "6"));
        assert!(!diff_is_zero("2+3", "6"));
    }

    #[test]
    fn brackets_expand() {
        assert!(diff_is_zero("(x+1)*(x+1)", "x**2 + 2*x + 1"));
        assert!(!diff_is_zero("(x+1)*(x+1)", "x**2 + x + 1"));
    }

    #[test]
    fn fractions_cancel_by_cross_multiplication() {
        assert!(diff_is_zero("x/y", "(2*x*y*x)/(2*x*y*y)"));
        assert!(!diff_is_zero("1/x", "1/x**20"));
    }

    #[test]
    fn sqrt_of_square_is_positive_root() {
        assert!(diff_is_zero("sqrt(x**2)", "x"));
        assert!(diff_is_zero("sqrt(x)*sqrt(x)", "x"));
        assert!(diff_is_zero("sqrt(4)", "2"));
    }

    #[test]
    fn cos_is_even_and_sin_is_odd() {
        assert!(diff_is_zero("cos(-x)", "cos(x)"));
        assert!(diff_is_zero("sin(-x)", "-sin(x)"));
        assert!(!diff_is_zero("sin(-x)", "sin(x)"));
    }

    #[test]
    fn pythagorean_identity_reduces() {
        assert!(diff_is_zero("sin(x)**2 + cos(x)**2", "1"));
        assert!(diff_is_zero(
            "1 + tan(x)",
            "sin(x)**2 + cos(x)**2 + sin(x)/cos(x)"
        ));
    }

    #[test]
    fn tan_collapses_onto_sin_and_cos() {
        assert!(diff_is_zero("tan(x)*cos(x)", "sin(x)"));
        assert!(diff_is_zero("cot(x)", "cos(x)/sin(x)"));
        assert!(diff_is_zero("sec(x)*cos(x)", "1"));
    }

    #[test]
    fn hyperbolic_identity_reduces() {
        assert!(diff_is_zero("cosh(x)**2 - sinh(x)**2", "1"));
        assert!(diff_is_zero("tanh(x)", "sinh(x)/cosh(x)"));
    }

    #[test]
    fn logarithms_share_kernels() {
        assert!(diff_is_zero("log(x, 10)", "log(x)/log(10)"));
        assert!(diff_is_zero("ln(x*y)", "ln(x) + ln(y)"));
        assert!(diff_is_zero("ln(x**2)", "2*ln(x)"));
        assert!(diff_is_zero("ln(4)", "2*ln(2)"));
    }

    #[test]
    fn exponentials_split_over_sums() {
        assert!(diff_is_zero("exp(x+y)", "exp(x)*exp(y)"));
        assert!(diff_is_zero("exp(2*x)", "exp(x)**2"));
        assert!(diff_is_zero("exp(ln(x))", "x"));
        assert!(diff_is_zero("ln(exp(x))", "x"));
    }

    #[test]
    fn factorial_of_literals_evaluates() {
        assert!(diff_is_zero("factorial(5)", "120"));
        assert!(diff_is_zero("factorial(0)", "1"));
    }

    #[test]
    fn imaginary_unit_squares_to_minus_one() {
        let ctx = MathsContext::new().with_hints(&["imaginary_i".to_string()]);
        let left = parse_maths("i*i", &ctx).unwrap();
        let right = parse_maths("-1", &ctx).unwrap();
        let difference = Expr::Add(vec![left, Expr::neg(right)]);
        assert!(is_zero(&difference).unwrap());
    }

    #[test]
    fn derivative_kernels_absorb_coefficients() {
        assert!(diff_is_zero("2 * Derivative(y, x) / 2", "Derivative(y, x)"));
        assert!(!diff_is_zero("Derivative(y, x)", "Derivative(y, z)"));
    }

    #[test]
    fn unsupported_constructs_are_reported() {
        let expr = Expr::Bool(true);
        assert!(is_zero(&expr).is_err());
    }

    #[test]
    fn huge_exponents_are_refused() {
        let ctx = MathsContext::new();
        let expr = parse_maths("x**2000", &ctx).unwrap();
        assert!(normalize(&expr).is_err());
    }
}
